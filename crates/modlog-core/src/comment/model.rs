//! Comment data models and status transitions

use crate::error::{ModlogError, Result};
use crate::types::{
    excerpt, CommentId, DecisionId, ExternalReportId, MembershipId, NeedId, ProjectId, TaskId,
    UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A user- or anonymously-authored comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique comment identifier
    pub id: CommentId,
    /// Comment text
    pub content: String,
    /// Moderation status
    pub status: CommentStatus,
    /// Upvotes minus downvotes, recomputed by the vote ledger
    #[serde(default)]
    pub score: i64,
    /// Direct APPROVED replies, recomputed by the comment manager
    #[serde(default)]
    pub total_replies: usize,
    /// Comment this one replies to
    #[serde(default)]
    pub parent: Option<CommentId>,
    /// Entity the comment is attached to
    #[serde(default)]
    pub parent_ref: ParentRef,
    /// Who wrote it
    pub author: Author,
    /// Submitting address, if the web layer recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Whether the content was ever edited
    #[serde(default)]
    pub is_edited: bool,
    /// Content snapshots taken before each edit, oldest first
    #[serde(default)]
    pub edit_history: Vec<EditRecord>,
    /// Last moderator to change the status
    #[serde(default)]
    pub moderated_by: Option<UserId>,
    #[serde(default)]
    pub moderated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub moderation_note: Option<String>,
    /// When the comment was created
    pub created_at: DateTime<Utc>,
    /// When the comment was last changed
    pub updated_at: DateTime<Utc>,
    /// Incremented on every mutation, used for optimistic concurrency
    #[serde(default)]
    pub version: u64,
}

impl Comment {
    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }

    fn transition(&mut self, status: CommentStatus, moderator: &UserId, note: Option<&str>) {
        self.status = status;
        self.moderated_by = Some(moderator.clone());
        self.moderated_at = Some(Utc::now());
        if let Some(note) = note {
            self.moderation_note = Some(note.to_string());
        }
        self.touch();
    }

    /// Move to APPROVED
    pub fn approve(&mut self, moderator: &UserId, note: Option<&str>) {
        self.transition(CommentStatus::Approved, moderator, note);
    }

    /// Move to REJECTED
    pub fn reject(&mut self, moderator: &UserId, note: Option<&str>) {
        self.transition(CommentStatus::Rejected, moderator, note);
    }

    /// Move to FLAGGED
    pub fn flag(&mut self, moderator: &UserId, note: Option<&str>) {
        self.transition(CommentStatus::Flagged, moderator, note);
    }

    /// Replace the content with the placeholder; the author stays visible
    pub fn remove_content_only(&mut self, moderator: &UserId, reason: Option<&str>, placeholder: &str) {
        self.content = placeholder.to_string();
        self.transition(CommentStatus::ContentRemoved, moderator, reason);
    }

    /// Hide the author; the content stays
    pub fn remove_author_only(&mut self, moderator: &UserId, reason: Option<&str>) {
        self.transition(CommentStatus::AuthorRemoved, moderator, reason);
    }

    /// Hide the author and replace the content
    pub fn remove_author_and_content(
        &mut self,
        moderator: &UserId,
        reason: Option<&str>,
        placeholder: &str,
    ) {
        self.content = placeholder.to_string();
        self.transition(CommentStatus::AuthorAndContentRemoved, moderator, reason);
    }

    /// Mark as the root of a deleted thread. The reply cascade is driven by
    /// [`CommentManager::soft_delete_thread`](super::CommentManager::soft_delete_thread).
    pub fn mark_thread_deleted(&mut self, moderator: &UserId, reason: Option<&str>) {
        self.transition(CommentStatus::ThreadDeleted, moderator, reason);
    }

    /// Mark as hidden because an ancestor thread was deleted
    pub fn mark_reply_to_deleted(&mut self, moderator: &UserId, reason: Option<&str>) {
        self.transition(CommentStatus::ReplyToDeleted, moderator, reason);
    }

    /// Replace the content, keeping the previous text in `edit_history`.
    /// Returns the previous content. Status is unchanged.
    pub fn edit(&mut self, new_content: impl Into<String>, editor: Option<&UserId>) -> String {
        let new_content = new_content.into();
        let previous = std::mem::replace(&mut self.content, new_content);
        self.edit_history.push(EditRecord {
            previous_content: previous.clone(),
            edited_at: Utc::now(),
            editor: editor.cloned(),
        });
        self.is_edited = true;
        self.touch();
        previous
    }

    /// Set the vote-derived score. Derived aggregates do not bump `version`.
    pub fn set_score(&mut self, score: i64) {
        self.score = score;
    }

    /// Set the derived reply count
    pub fn set_total_replies(&mut self, total: usize) {
        self.total_replies = total;
    }

    /// Whether this is a top-level comment
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Author name as shown to readers
    pub fn display_author(&self) -> String {
        if self.status.hides_author() {
            return "[removed]".to_string();
        }
        match &self.author {
            Author::Registered { id } => id.to_string(),
            Author::Anonymous { name, .. } => name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or("Anonymous")
                .to_string(),
        }
    }

    /// Content truncated to `max_chars`
    pub fn excerpt(&self, max_chars: usize) -> String {
        excerpt(&self.content, max_chars)
    }
}

/// Comment moderation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
    Flagged,
    ContentRemoved,
    AuthorRemoved,
    AuthorAndContentRemoved,
    ThreadDeleted,
    ReplyToDeleted,
}

impl CommentStatus {
    pub const ALL: [CommentStatus; 9] = [
        CommentStatus::Pending,
        CommentStatus::Approved,
        CommentStatus::Rejected,
        CommentStatus::Flagged,
        CommentStatus::ContentRemoved,
        CommentStatus::AuthorRemoved,
        CommentStatus::AuthorAndContentRemoved,
        CommentStatus::ThreadDeleted,
        CommentStatus::ReplyToDeleted,
    ];

    /// Wire name, e.g. "CONTENT_REMOVED"
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "PENDING",
            CommentStatus::Approved => "APPROVED",
            CommentStatus::Rejected => "REJECTED",
            CommentStatus::Flagged => "FLAGGED",
            CommentStatus::ContentRemoved => "CONTENT_REMOVED",
            CommentStatus::AuthorRemoved => "AUTHOR_REMOVED",
            CommentStatus::AuthorAndContentRemoved => "AUTHOR_AND_CONTENT_REMOVED",
            CommentStatus::ThreadDeleted => "THREAD_DELETED",
            CommentStatus::ReplyToDeleted => "REPLY_TO_DELETED",
        }
    }

    /// Counted in reply totals and shown normally
    pub fn is_visible(&self) -> bool {
        matches!(self, CommentStatus::Approved)
    }

    /// The author identity is hidden at presentation
    pub fn hides_author(&self) -> bool {
        matches!(
            self,
            CommentStatus::AuthorRemoved | CommentStatus::AuthorAndContentRemoved
        )
    }

    /// The content was replaced by the placeholder
    pub fn content_removed(&self) -> bool {
        matches!(
            self,
            CommentStatus::ContentRemoved | CommentStatus::AuthorAndContentRemoved
        )
    }

    /// Permanently hidden through thread deletion
    pub fn is_deleted(&self) -> bool {
        matches!(
            self,
            CommentStatus::ThreadDeleted | CommentStatus::ReplyToDeleted
        )
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CommentStatus::Pending => "Pending Review",
            CommentStatus::Approved => "Approved",
            CommentStatus::Rejected => "Rejected",
            CommentStatus::Flagged => "Flagged",
            CommentStatus::ContentRemoved => "Content Removed",
            CommentStatus::AuthorRemoved => "Author Removed",
            CommentStatus::AuthorAndContentRemoved => "Author and Content Removed",
            CommentStatus::ThreadDeleted => "Thread Deleted",
            CommentStatus::ReplyToDeleted => "Reply to Deleted Thread",
        };
        write!(f, "{}", label)
    }
}

impl Default for CommentStatus {
    fn default() -> Self {
        CommentStatus::Approved
    }
}

impl FromStr for CommentStatus {
    type Err = ModlogError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(&['-', ' '][..], "_");
        CommentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ModlogError::InvalidArgument(format!("Unknown comment status: {}", s)))
    }
}

/// Who wrote a comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
    /// A signed-in user
    Registered { id: UserId },
    /// An anonymous submission with optional contact details
    Anonymous {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
}

impl Author {
    /// Registered author
    pub fn user(id: impl Into<String>) -> Self {
        Author::Registered {
            id: UserId::from_string(id),
        }
    }

    /// Anonymous author
    pub fn anonymous(name: Option<String>, email: Option<String>) -> Self {
        Author::Anonymous { name, email }
    }

    /// User id of a registered author
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Author::Registered { id } => Some(id),
            Author::Anonymous { .. } => None,
        }
    }
}

/// The single entity a comment is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ParentRef {
    Project(ProjectId),
    Task(TaskId),
    Need(NeedId),
    Report(ExternalReportId),
    Membership(MembershipId),
    Decision(DecisionId),
    Comment(CommentId),
    #[default]
    None,
}

impl ParentRef {
    /// Attachment kind, e.g. "task"
    pub fn kind(&self) -> &'static str {
        match self {
            ParentRef::Project(_) => "project",
            ParentRef::Task(_) => "task",
            ParentRef::Need(_) => "need",
            ParentRef::Report(_) => "report",
            ParentRef::Membership(_) => "membership",
            ParentRef::Decision(_) => "decision",
            ParentRef::Comment(_) => "comment",
            ParentRef::None => "none",
        }
    }

    /// Parse "kind:id", e.g. "project:42"
    pub fn parse(s: &str) -> Result<Self> {
        let (kind, id) = s.split_once(':').ok_or_else(|| {
            ModlogError::InvalidArgument(format!("Expected <kind>:<id>, got '{}'", s))
        })?;
        let id = id.trim();
        if id.is_empty() {
            return Err(ModlogError::InvalidArgument(format!(
                "Missing id in attachment '{}'",
                s
            )));
        }
        Ok(match kind.trim().to_ascii_lowercase().as_str() {
            "project" => ParentRef::Project(ProjectId::from_string(id)),
            "task" => ParentRef::Task(TaskId::from_string(id)),
            "need" => ParentRef::Need(NeedId::from_string(id)),
            "report" => ParentRef::Report(ExternalReportId::from_string(id)),
            "membership" => ParentRef::Membership(MembershipId::from_string(id)),
            "decision" => ParentRef::Decision(DecisionId::from_string(id)),
            "comment" => ParentRef::Comment(CommentId::from_string(id)?),
            other => {
                return Err(ModlogError::InvalidArgument(format!(
                    "Unknown attachment kind: {}",
                    other
                )))
            }
        })
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ParentRef::None)
    }
}

impl std::fmt::Display for ParentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParentRef::Project(id) => write!(f, "project:{}", id),
            ParentRef::Task(id) => write!(f, "task:{}", id),
            ParentRef::Need(id) => write!(f, "need:{}", id),
            ParentRef::Report(id) => write!(f, "report:{}", id),
            ParentRef::Membership(id) => write!(f, "membership:{}", id),
            ParentRef::Decision(id) => write!(f, "decision:{}", id),
            ParentRef::Comment(id) => write!(f, "comment:{}", id),
            ParentRef::None => write!(f, "none"),
        }
    }
}

/// Snapshot of content replaced by an edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    pub previous_content: String,
    pub edited_at: DateTime<Utc>,
    pub editor: Option<UserId>,
}
