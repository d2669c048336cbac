//! Vote command

use super::{parse_comment_id, App, GlobalOpts};
use anyhow::{Context, Result};
use clap::Args;
use modlog_core::vote::VoteType;

/// Arguments for the vote command
#[derive(Debug, Args)]
pub struct VoteArgs {
    /// Comment ID
    pub id: String,

    /// up, down or clear
    pub vote: String,
}

/// Execute the vote command
pub fn execute(opts: &GlobalOpts, args: VoteArgs) -> Result<()> {
    use colored::Colorize;

    let app = App::open(opts)?;
    let id = parse_comment_id(&args.id)?;
    let actor = app.actor()?;

    let comment = if args.vote.trim().eq_ignore_ascii_case("clear") {
        app.service.remove_vote(&id, &actor.id)?
    } else {
        let vote_type: VoteType = args
            .vote
            .parse()
            .with_context(|| format!("Invalid vote '{}', expected up, down or clear", args.vote))?;
        app.service.cast_vote(&id, &actor.id, vote_type)?
    };

    let current = app
        .service
        .user_vote(&id, &actor.id)?
        .map(|v| v.vote_type.to_string())
        .unwrap_or_else(|| "none".to_string());
    println!(
        "{} Score {} (your vote: {})",
        "✓".green(),
        comment.score.to_string().cyan(),
        current
    );
    Ok(())
}
