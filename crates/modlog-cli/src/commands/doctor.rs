//! Doctor command
//!
//! Diagnose configuration and board consistency.

use super::{load_config, resolve_data_dir, GlobalOpts};
use anyhow::Result;
use clap::Args;
use modlog_core::config::Config;
use modlog_core::store::BoardStorage;
use modlog_core::Board;
use modlog_storage::FileSystemStorage;

/// Arguments for the doctor command
#[derive(Debug, Args)]
pub struct DoctorArgs {
    /// Show a suggested fix under each finding
    #[arg(long)]
    pub details: bool,
}

/// Check result
struct CheckResult {
    name: String,
    passed: bool,
    message: String,
    suggestion: Option<String>,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            suggestion: None,
        }
    }

    fn fail(name: &str, message: &str, suggestion: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            suggestion: suggestion.map(|s| s.to_string()),
        }
    }

    fn warn(name: &str, message: &str, suggestion: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: format!("⚠ {}", message),
            suggestion: suggestion.map(|s| s.to_string()),
        }
    }

    fn is_warning(&self) -> bool {
        self.passed && self.message.starts_with('⚠')
    }
}

/// Execute the doctor command
pub fn execute(opts: &GlobalOpts, args: DoctorArgs) -> Result<()> {
    use colored::Colorize;

    let mut results = Vec::new();

    println!("\n{}", "1. Configuration".bold().underline());
    let config = check_configuration(opts, &mut results).unwrap_or_default();

    println!("{}", "2. Board".bold().underline());
    results.extend(check_board(opts, &config));

    for result in &results {
        let status = if !result.passed {
            "✗".red()
        } else if result.is_warning() {
            "⚠".yellow()
        } else {
            "✓".green()
        };

        println!("   {} {}: {}", status, result.name, result.message);

        if args.details {
            if let Some(suggestion) = &result.suggestion {
                println!("     {}", suggestion.dimmed());
            }
        }
    }

    let warnings = results.iter().filter(|r| r.is_warning()).count();
    let errors: Vec<_> = results.iter().filter(|r| !r.passed).collect();

    println!(
        "\n{}: {} warnings, {} errors",
        "Summary".bold(),
        warnings.to_string().yellow(),
        errors.len().to_string().red()
    );

    if !errors.is_empty() {
        println!("\n{}", "✗ Errors:".red());
        for result in &errors {
            println!("  - {}: {}", result.name, result.message);
            if let Some(suggestion) = &result.suggestion {
                println!("    Fix: {}", suggestion);
            }
        }
        anyhow::bail!("{} checks failed", errors.len());
    }

    if warnings == 0 {
        println!("\n{} All checks passed!", "✓".green());
    }

    Ok(())
}

fn check_configuration(opts: &GlobalOpts, results: &mut Vec<CheckResult>) -> Option<Config> {
    results.push(CheckResult::ok("modlog version", env!("CARGO_PKG_VERSION")));

    if !opts.config_path.exists() {
        results.push(CheckResult::warn(
            "Configuration",
            &format!("{} not found, using defaults", opts.config_path.display()),
            Some("Run 'modlog init' to create it"),
        ));
        return Some(Config::default());
    }

    match load_config(&opts.config_path) {
        Ok(config) => {
            results.push(CheckResult::ok(
                "Configuration",
                &opts.config_path.display().to_string(),
            ));
            for warning in super::config::config_warnings(&config) {
                results.push(CheckResult::warn(
                    "Configuration",
                    &warning,
                    Some("Edit the [permissions] and [moderation] sections"),
                ));
            }
            Some(config)
        }
        Err(e) => {
            results.push(CheckResult::fail(
                "Configuration",
                &format!("{:#}", e),
                Some("Fix the TOML or run 'modlog init --force'"),
            ));
            None
        }
    }
}

fn check_board(opts: &GlobalOpts, config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let data_dir = resolve_data_dir(opts, config);

    let storage = match FileSystemStorage::new(&data_dir) {
        Ok(storage) => storage,
        Err(e) => {
            results.push(CheckResult::fail(
                "Data directory",
                &e.to_string(),
                Some("Check permissions on the data directory"),
            ));
            return results;
        }
    };
    results.push(CheckResult::ok(
        "Data directory",
        &data_dir.display().to_string(),
    ));

    let board = match storage.load() {
        Ok(Some(board)) => board,
        Ok(None) => {
            results.push(CheckResult::ok("Board", "empty"));
            return results;
        }
        Err(e) => {
            results.push(CheckResult::fail(
                "Board",
                &format!("{:#}", e),
                Some("Restore board.json from a backup"),
            ));
            return results;
        }
    };

    results.push(CheckResult::ok("Board", &board_summary(&board)));
    results.extend(check_invariants(&board));
    results
}

fn board_summary(board: &Board) -> String {
    format!(
        "{} comments, {} votes, {} reports, {} changelog entries",
        board.comments.count(),
        board.votes.count(),
        board.reports.count(),
        board.changelog.len()
    )
}

fn check_invariants(board: &Board) -> Vec<CheckResult> {
    let violations = board.invariant_violations();
    if violations.is_empty() {
        return vec![CheckResult::ok("Aggregates", "scores, reply counts and groups agree")];
    }
    violations
        .iter()
        .map(|v| CheckResult::fail("Aggregates", v, Some("Run 'modlog report rebuild'")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlog_core::comment::{Author, CommentBuilder};

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert!(result.passed);
        assert!(!result.is_warning());
        assert!(result.suggestion.is_none());
    }

    #[test]
    fn test_check_result_fail() {
        let result = CheckResult::fail("test", "failed", Some("fix it"));
        assert!(!result.passed);
        assert_eq!(result.suggestion, Some("fix it".to_string()));
    }

    #[test]
    fn test_check_result_warn() {
        let result = CheckResult::warn("test", "careful", None);
        assert!(result.is_warning());
    }

    #[test]
    fn test_invariants_on_consistent_board() {
        let mut board = Board::new();
        let comment = CommentBuilder::new(Author::user("alice"))
            .content("Hi")
            .on_project("p1")
            .build()
            .unwrap();
        board.add_comment(comment).unwrap();

        let results = check_invariants(&board);
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
        assert!(board_summary(&board).starts_with("1 comments"));
    }

    #[test]
    fn test_invariants_report_drift() {
        let mut board = Board::new();
        let comment = CommentBuilder::new(Author::user("alice"))
            .content("Hi")
            .on_project("p1")
            .build()
            .unwrap();
        let id = board.add_comment(comment).unwrap();
        board.comments.require_mut(&id).unwrap().set_score(7);

        let results = check_invariants(&board);
        assert!(results.iter().all(|r| !r.passed));
    }
}
