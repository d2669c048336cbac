//! Report command
//!
//! File reports, review them and work the grouped moderation queue.

use super::{parse_comment_id, print_json, App, GlobalOpts};
use anyhow::{Context, Result};
use clap::Subcommand;
use modlog_core::report::{
    CommentReport, GroupQuery, GroupSort, NewReport, ReportStatus, ReportType,
};
use modlog_core::types::{CommentId, ProjectId, ReportId};

/// Report subcommands
#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Report a comment
    File {
        /// Comment ID
        id: String,

        /// spam, harassment, hate_speech, inappropriate, misinformation, off_topic or other
        #[arg(long = "type", short)]
        report_type: String,

        /// Free-text explanation
        #[arg(long, short)]
        description: Option<String>,
    },

    /// List reports on a comment
    List {
        /// Comment ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the status of a single report
    Review {
        /// Report ID
        report: String,

        /// reviewed, rejected or resolved
        #[arg(long, short)]
        status: String,

        /// Moderator notes
        #[arg(long, short)]
        notes: Option<String>,
    },

    /// Delete a report
    Delete {
        /// Report ID
        report: String,
    },

    /// Show the moderation queue, one group per reported comment
    Groups {
        /// Only groups with this status
        #[arg(long)]
        status: Option<String>,

        /// Only groups with at least one report of this type
        #[arg(long = "type")]
        report_type: Option<String>,

        /// Only groups in this project
        #[arg(long)]
        project: Option<String>,

        /// total, first or last
        #[arg(long, default_value = "last")]
        sort: String,

        /// Oldest or smallest first
        #[arg(long)]
        asc: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute every report group
    Rebuild,
}

/// Execute the report command
pub fn execute(opts: &GlobalOpts, cmd: ReportCommand) -> Result<()> {
    let app = App::open(opts)?;

    match cmd {
        ReportCommand::File {
            id,
            report_type,
            description,
        } => file_report(&app, &id, &report_type, description),
        ReportCommand::List { id, json } => list_reports(&app, &id, json),
        ReportCommand::Review {
            report,
            status,
            notes,
        } => review_report(&app, &report, &status, notes.as_deref()),
        ReportCommand::Delete { report } => delete_report(&app, &report),
        ReportCommand::Groups {
            status,
            report_type,
            project,
            sort,
            asc,
            json,
        } => {
            let query = GroupQuery {
                status: status.as_deref().map(str::parse).transpose()?,
                report_type: report_type.as_deref().map(str::parse).transpose()?,
                project: project.map(ProjectId::from_string),
                sort: sort.parse::<GroupSort>()?,
                descending: !asc,
            };
            list_groups(&app, &query, json)
        }
        ReportCommand::Rebuild => rebuild_groups(&app),
    }
}

fn parse_report_id(s: &str) -> Result<ReportId> {
    ReportId::from_string(s).with_context(|| format!("Invalid report ID: {}", s))
}

/// Comment a report belongs to
fn report_comment(app: &App, id: &ReportId) -> Result<CommentId> {
    let comment = app
        .service
        .read(|board| board.reports.require(id).map(|r| r.comment))??;
    Ok(comment)
}

fn file_report(app: &App, id: &str, report_type: &str, description: Option<String>) -> Result<()> {
    use colored::Colorize;

    let id = parse_comment_id(id)?;
    let report_type: ReportType = report_type.parse()?;
    let report = app.service.file_report(
        &id,
        NewReport {
            reporter: Some(app.actor()?.id),
            report_type,
            description,
        },
    )?;

    println!(
        "{} Filed {} report {}",
        "✓".green(),
        report.report_type,
        report.id.to_string().green()
    );
    Ok(())
}

fn list_reports(app: &App, id: &str, as_json: bool) -> Result<()> {
    use colored::Colorize;

    let id = parse_comment_id(id)?;
    app.require_moderator(&id)?;
    let reports = app.service.reports_for(&id)?;

    if as_json {
        return print_json(&reports);
    }
    if reports.is_empty() {
        println!("No reports on comment {}.", id);
        return Ok(());
    }
    for report in &reports {
        print_report(report);
        if let Some(description) = &report.description {
            println!("      {}", description.dimmed());
        }
    }
    Ok(())
}

fn print_report(report: &CommentReport) {
    use colored::Colorize;

    let reporter = report
        .reporter
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    println!(
        "  {} {} {} by {} ({})",
        report.id.to_string().green(),
        report.report_type.as_str().cyan(),
        report.status.as_str().yellow(),
        reporter,
        report.created_at.format("%Y-%m-%d %H:%M")
    );
}

fn review_report(app: &App, report: &str, status: &str, notes: Option<&str>) -> Result<()> {
    use colored::Colorize;

    let id = parse_report_id(report)?;
    let status: ReportStatus = status.parse()?;
    let actor = app.require_moderator(&report_comment(app, &id)?)?;

    let report = app.service.review_report(&id, status, &actor.id, notes)?;
    println!("{} Report {} is now {}", "✓".green(), report.id, report.status);
    Ok(())
}

fn delete_report(app: &App, report: &str) -> Result<()> {
    use colored::Colorize;

    let id = parse_report_id(report)?;
    app.require_moderator(&report_comment(app, &id)?)?;

    let report = app.service.delete_report(&id)?;
    println!("{} Deleted report {}", "✓".green(), report.id);
    Ok(())
}

fn list_groups(app: &App, query: &GroupQuery, as_json: bool) -> Result<()> {
    use colored::Colorize;

    let groups = app.service.report_groups(query)?;
    let stats = app.service.group_stats()?;

    if as_json {
        return print_json(&serde_json::json!({
            "groups": groups,
            "stats": stats,
        }));
    }

    println!(
        "{} {} groups, {} pending, {} high priority",
        "Queue:".bold(),
        stats.total_groups,
        stats.pending_groups.to_string().yellow(),
        stats.high_priority.to_string().red()
    );
    println!();

    if groups.is_empty() {
        println!("No matching report groups.");
        return Ok(());
    }

    let threshold = app.config.moderation.high_priority_threshold;
    for group in &groups {
        let summary = group
            .report_types_summary
            .iter()
            .map(|(t, n)| format!("{}: {}", t, n))
            .collect::<Vec<_>>()
            .join(", ");
        let marker = if group.is_high_priority(threshold) {
            "!".red().bold()
        } else {
            " ".normal()
        };
        println!(
            "{} {} {} reports [{}] {} (last {})",
            marker,
            group.comment.to_string().green(),
            group.total_reports,
            summary,
            group.status.as_str().yellow(),
            group.last_reported_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn rebuild_groups(app: &App) -> Result<()> {
    use colored::Colorize;

    let actor = app.actor()?;
    if !actor.is_platform_moderator() {
        anyhow::bail!("Only staff can rebuild report groups");
    }
    let count = app.service.rebuild_report_groups()?;
    println!("{} Rebuilt {} report groups", "✓".green(), count);
    Ok(())
}
