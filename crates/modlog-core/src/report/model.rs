//! Comment report data models

use crate::error::{ModlogError, Result};
use crate::types::{CommentId, ProjectId, ReportId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Classification a reporter picks when filing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Spam,
    Harassment,
    HateSpeech,
    Misinformation,
    Inappropriate,
    OffTopic,
    Other,
}

impl ReportType {
    pub const ALL: [ReportType; 7] = [
        ReportType::Spam,
        ReportType::Harassment,
        ReportType::HateSpeech,
        ReportType::Misinformation,
        ReportType::Inappropriate,
        ReportType::OffTopic,
        ReportType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Spam => "SPAM",
            ReportType::Harassment => "HARASSMENT",
            ReportType::HateSpeech => "HATE_SPEECH",
            ReportType::Misinformation => "MISINFORMATION",
            ReportType::Inappropriate => "INAPPROPRIATE",
            ReportType::OffTopic => "OFF_TOPIC",
            ReportType::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReportType::Spam => "Spam",
            ReportType::Harassment => "Harassment",
            ReportType::HateSpeech => "Hate Speech",
            ReportType::Misinformation => "Misinformation",
            ReportType::Inappropriate => "Inappropriate Content",
            ReportType::OffTopic => "Off Topic",
            ReportType::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for ReportType {
    type Err = ModlogError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(&['-', ' '][..], "_");
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ModlogError::InvalidArgument(format!("Unknown report type: {}", s)))
    }
}

/// Review state of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Rejected,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        ReportStatus::Pending,
        ReportStatus::Reviewed,
        ReportStatus::Rejected,
        ReportStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Reviewed => "REVIEWED",
            ReportStatus::Rejected => "REJECTED",
            ReportStatus::Resolved => "RESOLVED",
        }
    }

    /// Still awaiting a final outcome
    pub fn is_active(&self) -> bool {
        matches!(self, ReportStatus::Pending | ReportStatus::Reviewed)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReportStatus::Pending => "Pending Review",
            ReportStatus::Reviewed => "Reviewed",
            ReportStatus::Rejected => "Rejected",
            ReportStatus::Resolved => "Resolved",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for ReportStatus {
    type Err = ModlogError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        ReportStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ModlogError::InvalidArgument(format!("Unknown report status: {}", s)))
    }
}

/// A complaint filed against one comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentReport {
    pub id: ReportId,
    pub comment: CommentId,
    /// Filing user; `None` for anonymous reports
    #[serde(default)]
    pub reporter: Option<UserId>,
    /// Author of the reported comment at filing time
    #[serde(default)]
    pub reported_user: Option<UserId>,
    pub report_type: ReportType,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ReportStatus,
    #[serde(default)]
    pub reviewed_by: Option<UserId>,
    #[serde(default)]
    pub moderator_notes: Option<String>,
    /// Project of the reported comment, denormalized for permission checks
    #[serde(default)]
    pub project: Option<ProjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Filing order within the report book
    #[serde(default)]
    pub sequence: u64,
}

impl CommentReport {
    /// Set the review outcome and append `note` to the moderator notes
    pub fn mark(&mut self, status: ReportStatus, moderator: &UserId, note: Option<&str>) {
        self.status = status;
        self.reviewed_by = Some(moderator.clone());
        if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
            self.moderator_notes = Some(match self.moderator_notes.take() {
                Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, note),
                _ => note.to_string(),
            });
        }
        self.updated_at = Utc::now();
    }
}
