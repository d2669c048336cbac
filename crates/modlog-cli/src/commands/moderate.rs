//! Moderate command
//!
//! Apply a moderation decision to a comment and its reports.

use super::{parse_comment_id, print_json, App, GlobalOpts};
use anyhow::{Context, Result};
use clap::Args;
use modlog_core::moderation::{AppliedDecision, ModerationAction, ModerationDecision};
use modlog_core::report::ReportType;
use modlog_core::types::ReportId;

/// Arguments for the moderate command
#[derive(Debug, Args)]
pub struct ModerateArgs {
    /// Comment ID
    pub id: String,

    /// approve, reject, flag, remove-content-only, remove-author-only,
    /// remove-author-and-content, delete-thread, edit, warn-user,
    /// suspend-user, ban-user or false-report
    pub decision: String,

    /// Which reports the decision resolves: all, type or single
    #[arg(long, default_value = "all")]
    pub scope: String,

    /// Report type for --scope type
    #[arg(long = "report-type")]
    pub report_type: Option<String>,

    /// Report ID for --scope single
    #[arg(long)]
    pub report: Option<String>,

    /// Reason recorded in the history
    #[arg(long, short)]
    pub reason: Option<String>,

    /// Replacement text for the edit decision
    #[arg(long)]
    pub content: Option<String>,

    /// Tell reporters about the outcome
    #[arg(long)]
    pub notify_reporters: bool,

    /// Escalate to platform staff
    #[arg(long)]
    pub escalate: bool,

    /// Suspension length for suspend-user
    #[arg(long)]
    pub days: Option<u32>,

    /// Fail if the comment changed since this version was read
    #[arg(long)]
    pub expected_version: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the moderate command
pub fn execute(opts: &GlobalOpts, args: ModerateArgs) -> Result<()> {
    let app = App::open(opts)?;
    let actor = app.actor()?;
    let action = build_action(&app, &actor.id, &args)?;

    let applied = app.service.moderate(&actor, action)?;
    let record = app
        .service
        .read(|board| board.action(&applied.action).cloned())??;

    if args.json {
        return print_json(&record);
    }
    print_applied(&app, &applied, &record);
    Ok(())
}

fn build_action(
    app: &App,
    moderator: &modlog_core::types::UserId,
    args: &ModerateArgs,
) -> Result<ModerationAction> {
    let id = parse_comment_id(&args.id)?;
    let decision: ModerationDecision = args.decision.parse()?;
    let report_type = args
        .report_type
        .as_deref()
        .map(str::parse::<ReportType>)
        .transpose()?;
    let report = args
        .report
        .as_deref()
        .map(|r| ReportId::from_string(r).with_context(|| format!("Invalid report ID: {}", r)))
        .transpose()?;

    let mut builder = ModerationAction::builder(id, moderator.clone(), decision)
        .scope_named(&args.scope, report_type, report)?
        .notify_reporters(args.notify_reporters)
        .escalate_to_platform(args.escalate)
        .max_suspension_days(app.config.moderation.max_suspension_days);
    if let Some(reason) = &args.reason {
        builder = builder.reason(reason);
    }
    if let Some(content) = &args.content {
        builder = builder.new_content(content);
    }
    if let Some(days) = args.days {
        builder = builder.suspension_days(days);
    }
    if let Some(version) = args.expected_version {
        builder = builder.expected_version(version);
    }

    Ok(builder.build()?)
}

fn print_applied(app: &App, applied: &AppliedDecision, action: &ModerationAction) {
    use colored::Colorize;

    println!(
        "{} {} applied to comment {}",
        "✓".green(),
        action.decision.label().bold(),
        action.comment.to_string().green()
    );
    println!("  Scope: {}", action.scope.label());
    println!("  Resolved reports: {}", applied.resolved_reports.len());
    if let Some(thread) = &applied.thread {
        println!("  Replies affected: {}", thread.affected.len());
    }
    if let Some(user) = &action.affected_user {
        println!("  Affected user: {}", user.to_string().yellow());
    }
    if let Some(until) = action.suspension_until {
        println!("  Suspended until: {}", until.format("%Y-%m-%d %H:%M"));
    }
    if action.escalate_to_platform {
        println!("  {}", "Escalated to platform staff".yellow());
    }
    if let Some(reason) = &action.reason {
        println!(
            "  Reason: {}",
            modlog_core::changelog::format_reason(
                Some(reason),
                app.config.moderation.reason_display_limit
            )
            .dimmed()
        );
    }
    if !applied.notifications.is_empty() {
        println!("  Notifications sent: {}", applied.notifications.len());
    }
}
