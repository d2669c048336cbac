//! modlog - comment moderation from the command line
//!
//! A front end over the modlog core: threaded comments, votes, reports and
//! moderation decisions with a full audit trail.
//!
//! ## Quick Start
//!
//! ```bash
//! # Initialize in the current directory
//! modlog init
//!
//! # Post and report a comment
//! modlog --as alice comment add --on project:p1 "Hello"
//! modlog --as bob report file <comment-id> --type spam
//!
//! # Review the queue and decide
//! modlog report groups
//! modlog --as mod moderate <comment-id> remove-content-only --reason "spam"
//! ```

mod commands;

fn main() {
    if let Err(err) = commands::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
