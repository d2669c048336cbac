//! Moderation decisions and the transition each one maps to

use crate::changelog::ChangeType;
use crate::comment::{Comment, CommentStatus};
use crate::error::{ModlogError, Result};
use crate::permission::ModeratorLevel;
use crate::report::{ReportStatus, ReportType};
use crate::types::{ReportId, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A moderator's classified action on one comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationDecision {
    Approve,
    Reject,
    Flag,
    RemoveContentOnly,
    RemoveAuthorOnly,
    RemoveAuthorAndContent,
    DeleteThread,
    Edit,
    FalseReport,
    WarnUser,
    SuspendUser,
    BanUser,
    /// Legacy alias of `RemoveContentOnly`
    Remove,
}

impl ModerationDecision {
    pub const ALL: [ModerationDecision; 13] = [
        ModerationDecision::Approve,
        ModerationDecision::Reject,
        ModerationDecision::Flag,
        ModerationDecision::RemoveContentOnly,
        ModerationDecision::RemoveAuthorOnly,
        ModerationDecision::RemoveAuthorAndContent,
        ModerationDecision::DeleteThread,
        ModerationDecision::Edit,
        ModerationDecision::FalseReport,
        ModerationDecision::WarnUser,
        ModerationDecision::SuspendUser,
        ModerationDecision::BanUser,
        ModerationDecision::Remove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationDecision::Approve => "APPROVE",
            ModerationDecision::Reject => "REJECT",
            ModerationDecision::Flag => "FLAG",
            ModerationDecision::RemoveContentOnly => "REMOVE_CONTENT_ONLY",
            ModerationDecision::RemoveAuthorOnly => "REMOVE_AUTHOR_ONLY",
            ModerationDecision::RemoveAuthorAndContent => "REMOVE_AUTHOR_AND_CONTENT",
            ModerationDecision::DeleteThread => "DELETE_THREAD",
            ModerationDecision::Edit => "EDIT",
            ModerationDecision::FalseReport => "FALSE_REPORT",
            ModerationDecision::WarnUser => "WARN_USER",
            ModerationDecision::SuspendUser => "SUSPEND_USER",
            ModerationDecision::BanUser => "BAN_USER",
            ModerationDecision::Remove => "REMOVE",
        }
    }

    /// Human-readable label used in notes and notifications
    pub fn label(&self) -> &'static str {
        match self {
            ModerationDecision::Approve => "Approve",
            ModerationDecision::Reject => "Reject",
            ModerationDecision::Flag => "Flag for Review",
            ModerationDecision::RemoveContentOnly => "Remove Content Only",
            ModerationDecision::RemoveAuthorOnly => "Remove Author Only",
            ModerationDecision::RemoveAuthorAndContent => "Remove Author and Content",
            ModerationDecision::DeleteThread => "Delete Thread",
            ModerationDecision::Edit => "Edit Content",
            ModerationDecision::FalseReport => "False Report",
            ModerationDecision::WarnUser => "Warn User",
            ModerationDecision::SuspendUser => "Suspend User",
            ModerationDecision::BanUser => "Ban User",
            ModerationDecision::Remove => "Remove",
        }
    }

    /// Past tense for author notifications, e.g. "Your comment was rejected"
    pub fn past_tense(&self) -> &'static str {
        match self {
            ModerationDecision::Approve | ModerationDecision::FalseReport => "approved",
            ModerationDecision::Reject => "rejected",
            ModerationDecision::Flag => "flagged for review",
            ModerationDecision::RemoveContentOnly | ModerationDecision::Remove => "removed",
            ModerationDecision::RemoveAuthorOnly => "anonymized",
            ModerationDecision::RemoveAuthorAndContent => "removed and anonymized",
            ModerationDecision::DeleteThread => "deleted",
            ModerationDecision::Edit => "edited",
            ModerationDecision::WarnUser => "the subject of a warning",
            ModerationDecision::SuspendUser => "the subject of a suspension",
            ModerationDecision::BanUser => "the subject of a ban",
        }
    }

    /// Acts on the author rather than the comment
    pub fn is_user_level(&self) -> bool {
        matches!(
            self,
            ModerationDecision::WarnUser
                | ModerationDecision::SuspendUser
                | ModerationDecision::BanUser
        )
    }

    /// Whether a moderator of `level` may issue this decision
    pub fn allowed_for(&self, level: ModeratorLevel) -> bool {
        match level {
            ModeratorLevel::Junior => !matches!(
                self,
                ModerationDecision::BanUser | ModerationDecision::Edit
            ),
            ModeratorLevel::Senior | ModeratorLevel::Admin => true,
        }
    }

    /// Status resolved reports move to
    pub fn report_status(&self) -> ReportStatus {
        match self {
            ModerationDecision::FalseReport => ReportStatus::Rejected,
            _ => ReportStatus::Resolved,
        }
    }

    /// What the decision does to `comment`
    pub fn outcome(&self, comment: &Comment, new_content: Option<&str>) -> Result<Outcome> {
        let outcome = match self {
            ModerationDecision::Approve => Outcome::Transition(Transition::Approve),
            ModerationDecision::Reject => Outcome::Transition(Transition::Reject),
            ModerationDecision::Flag => Outcome::Transition(Transition::Flag),
            ModerationDecision::RemoveContentOnly | ModerationDecision::Remove => {
                Outcome::Transition(Transition::RemoveContentOnly)
            }
            ModerationDecision::RemoveAuthorOnly => {
                Outcome::Transition(Transition::RemoveAuthorOnly)
            }
            ModerationDecision::RemoveAuthorAndContent => {
                Outcome::Transition(Transition::RemoveAuthorAndContent)
            }
            ModerationDecision::DeleteThread => Outcome::DeleteThread,
            ModerationDecision::Edit => {
                let content = new_content
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| {
                        ModlogError::InvalidArgument(
                            "New content is required for EDIT decisions".to_string(),
                        )
                    })?;
                Outcome::Transition(Transition::Edit(content.to_string()))
            }
            ModerationDecision::FalseReport => match comment.status {
                CommentStatus::Flagged | CommentStatus::Pending => {
                    Outcome::Transition(Transition::Approve)
                }
                _ => Outcome::Unchanged,
            },
            ModerationDecision::WarnUser
            | ModerationDecision::SuspendUser
            | ModerationDecision::BanUser => Outcome::Unchanged,
        };
        Ok(outcome)
    }
}

impl std::fmt::Display for ModerationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ModerationDecision {
    type Err = ModlogError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(&['-', ' '][..], "_");
        ModerationDecision::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| {
                ModlogError::InvalidArgument(format!("Unknown moderation decision: {}", s))
            })
    }
}

/// Effect of a decision on its comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A single state-machine transition
    Transition(Transition),
    /// Thread deletion with its reply cascade
    DeleteThread,
    /// The comment is left as is
    Unchanged,
}

/// Single-comment transitions a decision can request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    Flag,
    RemoveContentOnly,
    RemoveAuthorOnly,
    RemoveAuthorAndContent,
    Edit(String),
}

impl Transition {
    pub fn change_type(&self) -> ChangeType {
        match self {
            Transition::Approve => ChangeType::Approval,
            Transition::Reject => ChangeType::Rejection,
            Transition::Flag => ChangeType::Flagged,
            Transition::RemoveContentOnly => ChangeType::ContentRemoval,
            Transition::RemoveAuthorOnly => ChangeType::AuthorRemoval,
            Transition::RemoveAuthorAndContent => ChangeType::AuthorAndContentRemoval,
            Transition::Edit(_) => ChangeType::ModeratorEdit,
        }
    }

    /// Run the transition on `comment`
    pub fn apply(
        &self,
        comment: &mut Comment,
        moderator: &UserId,
        reason: Option<&str>,
        placeholder: &str,
    ) {
        match self {
            Transition::Approve => comment.approve(moderator, reason),
            Transition::Reject => comment.reject(moderator, reason),
            Transition::Flag => comment.flag(moderator, reason),
            Transition::RemoveContentOnly => {
                comment.remove_content_only(moderator, reason, placeholder)
            }
            Transition::RemoveAuthorOnly => comment.remove_author_only(moderator, reason),
            Transition::RemoveAuthorAndContent => {
                comment.remove_author_and_content(moderator, reason, placeholder)
            }
            Transition::Edit(content) => {
                comment.edit(content.clone(), Some(moderator));
            }
        }
    }
}

/// Which reports a decision resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "scope", content = "target", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionScope {
    /// Every active report on the comment
    #[default]
    AllReports,
    /// Active reports of one type
    ReportType(ReportType),
    /// Exactly one report, or none
    SingleReport(Option<ReportId>),
}

impl DecisionScope {
    pub fn label(&self) -> &'static str {
        match self {
            DecisionScope::AllReports => "ALL_REPORTS",
            DecisionScope::ReportType(_) => "REPORT_TYPE",
            DecisionScope::SingleReport(_) => "SINGLE_REPORT",
        }
    }
}
