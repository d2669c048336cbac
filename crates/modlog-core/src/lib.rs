//! modlog-core - Core library for modlog
//!
//! Comment moderation for a collaboration platform: threaded comments with a
//! moderation state machine, vote scores, report grouping, an append-only
//! changelog and the decision engine tying them together.

pub mod error;
pub mod types;
pub mod config;
pub mod permission;
pub mod comment;
pub mod vote;
pub mod report;
pub mod changelog;
pub mod moderation;
pub mod notify;
pub mod board;
pub mod store;
pub mod service;

pub use board::Board;
pub use error::{ModlogError, Result};
pub use service::{CommentService, NewComment};
pub use types::*;
