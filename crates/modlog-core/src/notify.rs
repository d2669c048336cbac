//! Best-effort notification collaborator
//!
//! Notifications are produced inside a transaction but only dispatched after
//! it commits. A failing sink never undoes the change that caused it.

use crate::error::Result;
use crate::types::{CommentId, UserId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Why a user is being notified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A report the user filed was resolved
    ReportResolved,
    /// A moderator acted on the user's comment
    CommentModerated,
    /// Someone replied to the user's comment
    Reply,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::ReportResolved => write!(f, "report-resolved"),
            NotificationKind::CommentModerated => write!(f, "comment-moderated"),
            NotificationKind::Reply => write!(f, "reply"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub message: String,
    /// Comment the notification is about
    pub comment: Option<CommentId>,
}

impl Notification {
    pub fn new(recipient: UserId, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            recipient,
            kind,
            message: message.into(),
            comment: None,
        }
    }

    pub fn about(mut self, comment: CommentId) -> Self {
        self.comment = Some(comment);
        self
    }
}

/// One-way notification delivery
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes each notification to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            recipient = %notification.recipient,
            kind = %notification.kind,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Discards notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }
}
