//! History command
//!
//! Show the changelog of a comment as the acting user may see it.

use super::{parse_comment_id, print_json, App, GlobalOpts};
use anyhow::Result;
use clap::Args;
use modlog_core::changelog::{format_reason, ChangeLogEntry};

/// Arguments for the history command
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Comment ID
    pub id: String,

    /// Only the newest entries (per `summary_entries`) and the total
    #[arg(long)]
    pub summary: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the history command
pub fn execute(opts: &GlobalOpts, args: HistoryArgs) -> Result<()> {
    use colored::Colorize;

    let app = App::open(opts)?;
    let id = parse_comment_id(&args.id)?;
    let actor = app.actor()?;

    let mut entries = app.service.history_for(&actor, &id)?;
    let total = entries.len();
    if args.summary {
        entries.truncate(app.config.moderation.summary_entries);
    }

    if args.json {
        return print_json(&entries);
    }

    println!("{} {}", "History of".bold(), id.to_string().green());
    let original = app.service.original_content(&id)?;
    println!("  Original: {}", original.dimmed());
    println!();

    if entries.is_empty() {
        println!("No changes recorded.");
        return Ok(());
    }

    let limit = app.config.moderation.reason_display_limit;
    for entry in &entries {
        print_entry(entry, limit);
    }
    if entries.len() < total {
        println!("\n  ... {} more entries", total - entries.len());
    }
    Ok(())
}

fn print_entry(entry: &ChangeLogEntry, reason_limit: usize) {
    use colored::Colorize;

    let by = entry
        .changed_by
        .as_ref()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "system".to_string());
    println!(
        "  {} {} by {}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        entry.change_type.as_str().cyan(),
        by
    );
    if let (Some(from), Some(to)) = (entry.previous_status, entry.new_status) {
        if from != to {
            println!("    status: {} -> {}", from, to);
        }
    }
    if entry.content_changed() {
        println!("    content changed");
    }
    if entry.affected_children_count > 0 {
        println!(
            "    bulk: {} replies affected",
            entry.affected_children_count
        );
    } else if entry.is_bulk() {
        println!("    part of a thread deletion");
    }
    println!("    reason: {}", format_reason(entry.reason.as_deref(), reason_limit).dimmed());
}
