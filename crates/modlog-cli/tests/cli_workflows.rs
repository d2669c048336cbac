use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = r#"
[permissions]
staff = ["ops"]
junior_moderators = ["trainee"]

[permissions.project_moderators]
p1 = ["mod", "trainee"]
"#;

fn workspace() -> TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join(".modlog")).expect("config dir");
    fs::write(tmp.path().join(".modlog/config.toml"), CONFIG).expect("config");
    tmp
}

fn modlog(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_modlog"));
    cmd.current_dir(dir.path())
        .env_remove("MODLOG_USER")
        .arg("--no-color");
    cmd
}

fn post(dir: &TempDir, user: &str, content: &str) -> String {
    let output = modlog(dir)
        .args(["--as", user, "comment", "add", "--on", "project:p1", "--json", content])
        .output()
        .expect("run comment add");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let comment: serde_json::Value = serde_json::from_slice(&output.stdout).expect("comment json");
    comment["id"].as_str().expect("comment id").to_string()
}

fn reply(dir: &TempDir, user: &str, parent: &str) -> String {
    let output = modlog(dir)
        .args(["--as", user, "comment", "reply", parent, "a reply", "--json"])
        .output()
        .expect("run comment reply");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let comment: serde_json::Value = serde_json::from_slice(&output.stdout).expect("reply json");
    comment["id"].as_str().expect("reply id").to_string()
}

fn report(dir: &TempDir, user: &str, comment: &str) {
    modlog(dir)
        .args(["--as", user, "report", "file", comment, "--type", "spam"])
        .assert()
        .success();
}

#[test]
fn help_lists_commands() {
    Command::new(env!("CARGO_BIN_EXE_modlog"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("moderate"))
        .stdout(predicate::str::contains("report"));
}

#[test]
fn init_writes_config_once() {
    let tmp = tempfile::tempdir().expect("tempdir");

    modlog(&tmp).arg("init").assert().success();
    assert!(tmp.path().join(".modlog/config.toml").exists());
    assert!(tmp.path().join(".modlog/data").is_dir());

    modlog(&tmp)
        .arg("init")
        .assert()
        .success()
        .stderr(predicate::str::contains("already initialized"));

    modlog(&tmp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[moderation]"));
}

#[test]
fn posting_requires_an_acting_user() {
    let tmp = workspace();
    modlog(&tmp)
        .args(["comment", "add", "--on", "project:p1", "Hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--as"));
}

#[test]
fn anonymous_comments_need_no_user() {
    let tmp = workspace();
    modlog(&tmp)
        .args(["comment", "add", "--on", "project:p1", "--anonymous", "Sam", "Hi there"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created comment"));
}

#[test]
fn replies_are_counted_on_the_parent() {
    let tmp = workspace();
    let root = post(&tmp, "alice", "Hello");
    reply(&tmp, "bob", &root);

    modlog(&tmp)
        .args(["comment", "show", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("Replies: 1"))
        .stdout(predicate::str::contains("bob"));
}

#[test]
fn switching_a_vote_keeps_one_vote() {
    let tmp = workspace();
    let root = post(&tmp, "alice", "Vote on me");

    modlog(&tmp)
        .args(["--as", "u", "vote", &root, "up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score 1"));
    modlog(&tmp)
        .args(["--as", "u", "vote", &root, "down"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score -1"));
    modlog(&tmp)
        .args(["--as", "u", "vote", &root, "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("your vote: none"));
}

#[test]
fn reporting_your_own_comment_fails() {
    let tmp = workspace();
    let root = post(&tmp, "alice", "Mine");

    modlog(&tmp)
        .args(["--as", "alice", "report", "file", &root, "--type", "spam"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("your own comment"));
}

#[test]
fn remove_content_resolves_every_report() {
    let tmp = workspace();
    let root = post(&tmp, "alice", "Buy cheap watches");
    for reporter in ["r1", "r2", "r3"] {
        report(&tmp, reporter, &root);
    }

    let output = modlog(&tmp)
        .args(["report", "groups", "--json"])
        .output()
        .expect("run report groups");
    assert!(output.status.success());
    let queue: serde_json::Value = serde_json::from_slice(&output.stdout).expect("groups json");
    assert_eq!(queue["groups"][0]["total_reports"], 3);
    assert_eq!(queue["stats"]["high_priority"], 1);

    modlog(&tmp)
        .args([
            "--as",
            "mod",
            "moderate",
            &root,
            "remove-content-only",
            "--reason",
            "spam",
            "--notify-reporters",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolved reports: 3"));

    modlog(&tmp)
        .args(["comment", "show", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Content removed by moderator]"));

    modlog(&tmp)
        .args(["--as", "mod", "history", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("CONTENT_REMOVAL"))
        .stdout(predicate::str::contains("Buy cheap watches"));

    modlog(&tmp)
        .args(["report", "groups", "--status", "pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matching report groups"));
}

#[test]
fn junior_moderators_cannot_ban() {
    let tmp = workspace();
    let root = post(&tmp, "alice", "Text");

    modlog(&tmp)
        .args(["--as", "trainee", "moderate", &root, "ban-user"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("may not issue"));

    modlog(&tmp)
        .args(["--as", "trainee", "moderate", &root, "flag"])
        .assert()
        .success();
}

#[test]
fn outsiders_cannot_moderate() {
    let tmp = workspace();
    let root = post(&tmp, "alice", "Text");

    modlog(&tmp)
        .args(["--as", "eve", "moderate", &root, "reject"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot moderate"));
}

#[test]
fn stale_version_is_rejected() {
    let tmp = workspace();
    let root = post(&tmp, "alice", "Text");

    modlog(&tmp)
        .args(["--as", "mod", "moderate", &root, "flag", "--expected-version", "0"])
        .assert()
        .success();
    modlog(&tmp)
        .args(["--as", "mod", "moderate", &root, "reject", "--expected-version", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conflict on comment"));
}

#[test]
fn thread_deletion_cascades() {
    let tmp = workspace();
    let root = post(&tmp, "alice", "Thread");
    let child = reply(&tmp, "bob", &root);
    reply(&tmp, "carol", &child);

    modlog(&tmp)
        .args(["--as", "mod", "thread", "delete", &root, "--reason", "derailed", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 replies marked"));

    modlog(&tmp)
        .args(["comment", "show", &child])
        .assert()
        .success()
        .stdout(predicate::str::contains("REPLY_TO_DELETED"));

    modlog(&tmp).arg("doctor").assert().success();
    modlog(&tmp)
        .args(["-v", "doctor", "--details"])
        .assert()
        .success();
}

#[test]
fn staff_see_user_edits_in_history() {
    let tmp = workspace();
    let root = post(&tmp, "alice", "First draft");
    modlog(&tmp)
        .args(["--as", "alice", "comment", "edit", &root, "Second draft"])
        .assert()
        .success();

    modlog(&tmp)
        .args(["--as", "ops", "history", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("USER_EDIT"))
        .stdout(predicate::str::contains("Original: First draft"));

    modlog(&tmp)
        .args(["--as", "mod", "history", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes recorded"));

    modlog(&tmp)
        .args(["--as", "eve", "history", &root])
        .assert()
        .failure();
}
