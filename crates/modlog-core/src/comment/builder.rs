//! Comment builder for fluent API

use super::model::{Author, Comment, CommentStatus, ParentRef};
use crate::error::{ModlogError, Result};
use crate::types::{
    CommentId, DecisionId, ExternalReportId, MembershipId, NeedId, ProjectId, TaskId,
};
use chrono::Utc;

/// Builder for creating comments with fluent API.
///
/// A comment is attached to exactly one entity. Setting two different
/// attachments is an error at [`build`](CommentBuilder::build); a reply with
/// no explicit attachment inherits its parent's.
pub struct CommentBuilder {
    author: Author,
    content: Option<String>,
    parent: Option<(CommentId, ParentRef)>,
    parent_ref: Option<ParentRef>,
    conflicting_ref: Option<ParentRef>,
    status: CommentStatus,
    ip_address: Option<String>,
}

impl CommentBuilder {
    /// Create a new builder for the given author
    pub fn new(author: Author) -> Self {
        Self {
            author,
            content: None,
            parent: None,
            parent_ref: None,
            conflicting_ref: None,
            status: CommentStatus::Approved,
            ip_address: None,
        }
    }

    /// Set the comment content
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Attach to an entity
    pub fn attach(mut self, parent_ref: ParentRef) -> Self {
        if parent_ref.is_none() {
            return self;
        }
        match &self.parent_ref {
            Some(existing) if *existing != parent_ref => {
                self.conflicting_ref = Some(parent_ref);
            }
            _ => self.parent_ref = Some(parent_ref),
        }
        self
    }

    /// Attach to a project
    pub fn on_project(self, id: impl Into<String>) -> Self {
        self.attach(ParentRef::Project(ProjectId::from_string(id)))
    }

    /// Attach to a task
    pub fn on_task(self, id: impl Into<String>) -> Self {
        self.attach(ParentRef::Task(TaskId::from_string(id)))
    }

    /// Attach to a need
    pub fn on_need(self, id: impl Into<String>) -> Self {
        self.attach(ParentRef::Need(NeedId::from_string(id)))
    }

    /// Attach to a moderation-app report
    pub fn on_report(self, id: impl Into<String>) -> Self {
        self.attach(ParentRef::Report(ExternalReportId::from_string(id)))
    }

    /// Attach to a membership
    pub fn on_membership(self, id: impl Into<String>) -> Self {
        self.attach(ParentRef::Membership(MembershipId::from_string(id)))
    }

    /// Attach to a decision
    pub fn on_decision(self, id: impl Into<String>) -> Self {
        self.attach(ParentRef::Decision(DecisionId::from_string(id)))
    }

    /// Attach to another comment (a reference, not a reply)
    pub fn on_comment(self, id: CommentId) -> Self {
        self.attach(ParentRef::Comment(id))
    }

    /// Make this a reply to `parent`
    pub fn reply_to(mut self, parent: &Comment) -> Self {
        self.parent = Some((parent.id, parent.parent_ref.clone()));
        self
    }

    /// Set the initial status (APPROVED unless pre-moderation applies)
    pub fn status(mut self, status: CommentStatus) -> Self {
        self.status = status;
        self
    }

    /// Record the submitting address
    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Build the comment
    pub fn build(self) -> Result<Comment> {
        let content = self.content.ok_or_else(|| {
            ModlogError::InvalidArgument("Comment content is required".to_string())
        })?;

        if content.trim().is_empty() {
            return Err(ModlogError::InvalidArgument(
                "Comment content cannot be empty".to_string(),
            ));
        }

        if let (Some(first), Some(second)) = (&self.parent_ref, &self.conflicting_ref) {
            return Err(ModlogError::InvalidArgument(format!(
                "A comment is attached to exactly one entity, got {} and {}",
                first, second
            )));
        }

        let (parent, inherited) = match self.parent {
            Some((id, parent_ref)) => (Some(id), parent_ref),
            None => (None, ParentRef::None),
        };
        let parent_ref = self.parent_ref.unwrap_or(inherited);

        let now = Utc::now();

        Ok(Comment {
            id: CommentId::new(),
            content,
            status: self.status,
            score: 0,
            total_replies: 0,
            parent,
            parent_ref,
            author: self.author,
            ip_address: self.ip_address,
            is_edited: false,
            edit_history: Vec::new(),
            moderated_by: None,
            moderated_at: None,
            moderation_note: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }
}
