//! Changelog entry types

use crate::comment::CommentStatus;
use crate::error::{ModlogError, Result};
use crate::types::{ActionId, BulkOperationId, ChangeId, CommentId, ProjectId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of state-affecting change recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    UserEdit,
    ModeratorEdit,
    StatusChange,
    ContentRemoval,
    AuthorRemoval,
    AuthorAndContentRemoval,
    ThreadDeletion,
    BulkThreadDeletion,
    Approval,
    Rejection,
    Flagged,
}

impl ChangeType {
    pub const ALL: [ChangeType; 11] = [
        ChangeType::UserEdit,
        ChangeType::ModeratorEdit,
        ChangeType::StatusChange,
        ChangeType::ContentRemoval,
        ChangeType::AuthorRemoval,
        ChangeType::AuthorAndContentRemoval,
        ChangeType::ThreadDeletion,
        ChangeType::BulkThreadDeletion,
        ChangeType::Approval,
        ChangeType::Rejection,
        ChangeType::Flagged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::UserEdit => "USER_EDIT",
            ChangeType::ModeratorEdit => "MODERATOR_EDIT",
            ChangeType::StatusChange => "STATUS_CHANGE",
            ChangeType::ContentRemoval => "CONTENT_REMOVAL",
            ChangeType::AuthorRemoval => "AUTHOR_REMOVAL",
            ChangeType::AuthorAndContentRemoval => "AUTHOR_AND_CONTENT_REMOVAL",
            ChangeType::ThreadDeletion => "THREAD_DELETION",
            ChangeType::BulkThreadDeletion => "BULK_THREAD_DELETION",
            ChangeType::Approval => "APPROVAL",
            ChangeType::Rejection => "REJECTION",
            ChangeType::Flagged => "FLAGGED",
        }
    }

    /// Everything except plain user edits
    pub fn is_moderation(&self) -> bool {
        !matches!(self, ChangeType::UserEdit)
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ChangeType::UserEdit => "User Edit",
            ChangeType::ModeratorEdit => "Moderator Edit",
            ChangeType::StatusChange => "Status Change",
            ChangeType::ContentRemoval => "Content Removal",
            ChangeType::AuthorRemoval => "Author Removal",
            ChangeType::AuthorAndContentRemoval => "Author and Content Removal",
            ChangeType::ThreadDeletion => "Thread Deletion",
            ChangeType::BulkThreadDeletion => "Bulk Thread Deletion",
            ChangeType::Approval => "Approval",
            ChangeType::Rejection => "Rejection",
            ChangeType::Flagged => "Flagged",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for ChangeType {
    type Err = ModlogError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(&['-', ' '][..], "_");
        ChangeType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ModlogError::InvalidArgument(format!("Unknown change type: {}", s)))
    }
}

/// One immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: ChangeId,
    pub comment: CommentId,
    pub change_type: ChangeType,
    /// `None` for anonymous edits
    pub changed_by: Option<UserId>,
    pub previous_content: Option<String>,
    pub new_content: Option<String>,
    pub previous_status: Option<CommentStatus>,
    pub new_status: Option<CommentStatus>,
    pub reason: Option<String>,
    /// Moderation action that caused the change
    pub moderation_action: Option<ActionId>,
    #[serde(default)]
    pub affected_children_count: usize,
    pub bulk_operation_id: Option<BulkOperationId>,
    #[serde(default)]
    pub project: Option<ProjectId>,
    pub created_at: DateTime<Utc>,
    /// Append position in the ledger; breaks timestamp ties
    pub sequence: u64,
}

impl ChangeLogEntry {
    /// Part of a fan-out operation
    pub fn is_bulk(&self) -> bool {
        self.bulk_operation_id.is_some()
    }

    pub fn status_changed(&self) -> bool {
        self.previous_status.is_some() && self.previous_status != self.new_status
    }

    pub fn content_changed(&self) -> bool {
        self.previous_content.is_some() && self.previous_content != self.new_content
    }
}

/// Fields of an entry to append
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub change_type: ChangeType,
    pub changed_by: Option<UserId>,
    pub previous_content: Option<String>,
    pub new_content: Option<String>,
    pub previous_status: Option<CommentStatus>,
    pub new_status: Option<CommentStatus>,
    pub reason: Option<String>,
    pub moderation_action: Option<ActionId>,
    pub affected_children_count: usize,
    pub bulk_operation_id: Option<BulkOperationId>,
    pub project: Option<ProjectId>,
}

impl ChangeRecord {
    pub fn new(change_type: ChangeType, changed_by: Option<&UserId>) -> Self {
        Self {
            change_type,
            changed_by: changed_by.cloned(),
            previous_content: None,
            new_content: None,
            previous_status: None,
            new_status: None,
            reason: None,
            moderation_action: None,
            affected_children_count: 0,
            bulk_operation_id: None,
            project: None,
        }
    }

    pub fn content(mut self, previous: impl Into<String>, new: impl Into<String>) -> Self {
        self.previous_content = Some(previous.into());
        self.new_content = Some(new.into());
        self
    }

    pub fn status(mut self, previous: CommentStatus, new: CommentStatus) -> Self {
        self.previous_status = Some(previous);
        self.new_status = Some(new);
        self
    }

    pub fn reason(mut self, reason: Option<&str>) -> Self {
        self.reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        self
    }

    pub fn action(mut self, action: Option<ActionId>) -> Self {
        self.moderation_action = action;
        self
    }

    pub fn bulk(mut self, id: BulkOperationId, affected_children: usize) -> Self {
        self.bulk_operation_id = Some(id);
        self.affected_children_count = affected_children;
        self
    }

    pub fn project(mut self, project: Option<ProjectId>) -> Self {
        self.project = project;
        self
    }
}

/// Reason text for display: a fallback for empty reasons, truncated past `limit`
pub fn format_reason(reason: Option<&str>, limit: usize) -> String {
    let reason = reason.map(str::trim).unwrap_or("");
    if reason.is_empty() {
        return "No reason provided".to_string();
    }
    if reason.chars().count() > limit {
        let cut: String = reason.chars().take(limit.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        reason.to_string()
    }
}
