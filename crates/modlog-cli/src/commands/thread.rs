//! Thread command

use super::{parse_comment_id, App, GlobalOpts};
use anyhow::Result;
use clap::Subcommand;

/// Thread subcommands
#[derive(Debug, Subcommand)]
pub enum ThreadCommand {
    /// Soft-delete a comment and cascade to its replies
    Delete {
        /// Root comment ID
        id: String,

        /// Reason recorded in the history
        #[arg(long, short)]
        reason: Option<String>,

        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

/// Execute the thread command
pub fn execute(opts: &GlobalOpts, cmd: ThreadCommand) -> Result<()> {
    match cmd {
        ThreadCommand::Delete { id, reason, yes } => delete_thread(opts, &id, reason.as_deref(), yes),
    }
}

fn delete_thread(opts: &GlobalOpts, id: &str, reason: Option<&str>, yes: bool) -> Result<()> {
    use colored::Colorize;

    let app = App::open(opts)?;
    let id = parse_comment_id(id)?;
    let actor = app.require_moderator(&id)?;

    if !yes {
        use dialoguer::Confirm;

        let descendants = app.service.read(|board| board.comments.descendants(&id).len())?;
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete thread {} ({} replies below it)?",
                id, descendants
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let deletion = app.service.soft_delete_thread(&id, &actor.id, reason)?;
    println!(
        "{} Deleted thread {} ({} replies marked)",
        "✓".green(),
        deletion.root.to_string().green(),
        deletion.affected.len()
    );
    if let Some(bulk) = deletion.bulk_operation {
        println!("  Bulk operation: {}", bulk.to_string().dimmed());
    }
    Ok(())
}
