//! Comment command
//!
//! Post, edit, read and remove comments.

use super::{parse_comment_id, print_json, App, GlobalOpts};
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use modlog_core::comment::{Author, Comment, ParentRef};
use modlog_core::NewComment;

/// Comment subcommands
#[derive(Debug, Subcommand)]
pub enum CommentCommand {
    /// Post a top-level comment
    Add {
        /// Entity to comment on, e.g. project:p1 or task:t7
        #[arg(long)]
        on: String,

        /// Comment text
        content: String,

        /// Post anonymously under this name (no --as needed)
        #[arg(long)]
        anonymous: Option<String>,

        /// Contact email for anonymous comments
        #[arg(long, requires = "anonymous")]
        email: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reply to a comment
    Reply {
        /// Comment being replied to
        parent: String,

        /// Reply text
        content: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a comment's content
    Edit {
        /// Comment ID
        id: String,

        /// New text
        content: String,
    },

    /// Show a comment and its direct replies
    Show {
        /// Comment ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List top-level comments on an entity
    List {
        /// Entity, e.g. project:p1
        #[arg(long)]
        on: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Permanently delete a comment and all of its replies
    Remove {
        /// Comment ID
        id: String,

        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

/// Execute the comment command
pub fn execute(opts: &GlobalOpts, cmd: CommentCommand) -> Result<()> {
    let app = App::open(opts)?;

    match cmd {
        CommentCommand::Add {
            on,
            content,
            anonymous,
            email,
            json,
        } => add_comment(&app, &on, content, anonymous, email, json),
        CommentCommand::Reply {
            parent,
            content,
            json,
        } => reply_to(&app, &parent, content, json),
        CommentCommand::Edit { id, content } => edit_comment(&app, &id, &content),
        CommentCommand::Show { id, json } => show_comment(&app, &id, json),
        CommentCommand::List { on, json } => list_comments(&app, &on, json),
        CommentCommand::Remove { id, yes } => remove_comment(&app, &id, yes),
    }
}

fn author_for(app: &App, anonymous: Option<String>, email: Option<String>) -> Result<Author> {
    match anonymous {
        Some(name) => Ok(Author::anonymous(Some(name), email)),
        None => Ok(Author::Registered {
            id: app.actor()?.id,
        }),
    }
}

fn add_comment(
    app: &App,
    on: &str,
    content: String,
    anonymous: Option<String>,
    email: Option<String>,
    as_json: bool,
) -> Result<()> {
    let parent_ref = ParentRef::parse(on).with_context(|| format!("Invalid entity: {}", on))?;
    let author = author_for(app, anonymous, email)?;

    let comment = app
        .service
        .create_comment(NewComment::new(author, content).attach(parent_ref))?;
    report_created(&comment, as_json)
}

fn reply_to(app: &App, parent: &str, content: String, as_json: bool) -> Result<()> {
    let parent = parse_comment_id(parent)?;
    let author = Author::Registered {
        id: app.actor()?.id,
    };

    let comment = app
        .service
        .create_comment(NewComment::new(author, content).reply_to(parent))?;
    report_created(&comment, as_json)
}

fn report_created(comment: &Comment, as_json: bool) -> Result<()> {
    use colored::Colorize;

    if as_json {
        return print_json(comment);
    }
    println!(
        "{} Created comment {} ({})",
        "✓".green(),
        comment.id.to_string().green(),
        comment.status
    );
    Ok(())
}

fn edit_comment(app: &App, id: &str, content: &str) -> Result<()> {
    use colored::Colorize;

    let id = parse_comment_id(id)?;
    let actor = app.actor()?;
    if !app.service.can_edit(&actor, &id)? {
        bail!("{} is not allowed to edit comment {}", actor.id, id);
    }

    let comment = app.service.edit_comment(&id, Some(&actor.id), content)?;
    println!(
        "{} Edited comment {} ({} edits)",
        "✓".green(),
        comment.id,
        comment.edit_history.len()
    );
    Ok(())
}

fn show_comment(app: &App, id: &str, as_json: bool) -> Result<()> {
    use colored::Colorize;

    let id = parse_comment_id(id)?;
    let comment = app
        .service
        .comment(&id)
        .context(format!("Comment '{}' not found", id))?;
    let replies = app.service.replies(&id)?;

    if as_json {
        return print_json(&serde_json::json!({
            "comment": comment,
            "replies": replies,
        }));
    }

    println!("{}", "Comment Details".bold().underline());
    println!();
    println!("  ID: {}", comment.id.to_string().green());
    println!("  On: {}", comment.parent_ref);
    if let Some(parent) = comment.parent {
        println!("  Reply to: {}", parent);
    }
    println!("  Author: {}", comment.display_author());
    println!("  Status: {}", status_colored(&comment));
    println!("  Score: {}", comment.score);
    println!("  Replies: {}", comment.total_replies);
    println!(
        "  Created: {}",
        comment.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if comment.is_edited {
        println!("  Edited: {} times", comment.edit_history.len());
    }
    if let Some(moderator) = &comment.moderated_by {
        println!("  Moderated by: {}", moderator);
    }
    if let Some(note) = &comment.moderation_note {
        println!("  Note: {}", note.dimmed());
    }
    println!();
    println!("  {}", comment.content);

    if !replies.is_empty() {
        println!();
        println!("{}", "Replies:".bold());
        for reply in &replies {
            print_line(reply, app.config.moderation.excerpt_length);
        }
    }

    Ok(())
}

fn list_comments(app: &App, on: &str, as_json: bool) -> Result<()> {
    let parent_ref = ParentRef::parse(on).with_context(|| format!("Invalid entity: {}", on))?;
    let comments = app.service.top_level(&parent_ref)?;

    if as_json {
        return print_json(&comments);
    }
    if comments.is_empty() {
        println!("No comments on {}.", parent_ref);
        return Ok(());
    }
    for comment in &comments {
        print_line(comment, app.config.moderation.excerpt_length);
    }
    Ok(())
}

fn remove_comment(app: &App, id: &str, yes: bool) -> Result<()> {
    use colored::Colorize;

    let id = parse_comment_id(id)?;
    let actor = app.actor()?;
    if !actor.is_platform_moderator() {
        bail!("Only staff can permanently remove comments");
    }

    if !yes {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(format!("Permanently delete comment {} and all replies?", id))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Removal cancelled.");
            return Ok(());
        }
    }

    let removal = app.service.remove_comment(&id)?;
    println!(
        "{} Removed {} comments ({} votes, {} reports)",
        "✓".green(),
        removal.comments.len(),
        removal.votes,
        removal.reports
    );
    Ok(())
}

/// One-line listing of a comment
pub fn print_line(comment: &Comment, excerpt_length: usize) {
    use colored::Colorize;

    println!(
        "  {} {} {} ({} points, {} replies) {}",
        comment.id.to_string().green(),
        comment.display_author().cyan(),
        status_colored(comment),
        comment.score,
        comment.total_replies,
        comment.excerpt(excerpt_length).dimmed()
    );
}

fn status_colored(comment: &Comment) -> colored::ColoredString {
    use colored::Colorize;

    let status = comment.status.as_str();
    if comment.status.is_visible() {
        status.green()
    } else if comment.status.is_deleted() || comment.status.content_removed() {
        status.red()
    } else {
        status.yellow()
    }
}
