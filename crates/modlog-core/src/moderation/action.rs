//! Moderation action records

use super::decision::{DecisionScope, ModerationDecision};
use crate::error::{ModlogError, Result};
use crate::types::{ActionId, ChangeId, CommentId, ProjectId, ReportId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for suspensions when no configuration is supplied
pub const DEFAULT_MAX_SUSPENSION_DAYS: u32 = 365;

/// Audit record of one moderator decision. Immutable once applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationAction {
    pub id: ActionId,
    pub comment: CommentId,
    pub moderator: UserId,
    pub decision: ModerationDecision,
    #[serde(default)]
    pub scope: DecisionScope,
    #[serde(default)]
    pub reason: Option<String>,
    /// Replacement text for EDIT
    #[serde(default)]
    pub new_content: Option<String>,
    #[serde(default)]
    pub notify_reporters: bool,
    /// Hand the case to platform-wide moderation
    #[serde(default)]
    pub escalate_to_platform: bool,
    #[serde(default)]
    pub suspension_days: Option<u32>,
    #[serde(default)]
    pub suspension_until: Option<DateTime<Utc>>,
    /// Comment version the moderator saw; a mismatch aborts the action
    #[serde(default)]
    pub expected_version: Option<u64>,
    #[serde(default)]
    pub project: Option<ProjectId>,

    // Filled in when the decision is applied
    #[serde(default)]
    pub previous_content: Option<String>,
    #[serde(default)]
    pub applied_content: Option<String>,
    #[serde(default)]
    pub affected_user: Option<UserId>,
    #[serde(default)]
    pub resolved_reports: Vec<ReportId>,
    #[serde(default)]
    pub change: Option<ChangeId>,
    pub created_at: DateTime<Utc>,
}

impl ModerationAction {
    pub fn builder(
        comment: CommentId,
        moderator: UserId,
        decision: ModerationDecision,
    ) -> ModerationActionBuilder {
        ModerationActionBuilder::new(comment, moderator, decision)
    }

    /// Check decision-specific fields
    pub fn validate(&self, max_suspension_days: u32) -> Result<()> {
        if self.decision == ModerationDecision::Edit
            && self
                .new_content
                .as_deref()
                .map_or(true, |c| c.trim().is_empty())
        {
            return Err(ModlogError::InvalidArgument(
                "New content is required for EDIT decisions".to_string(),
            ));
        }

        if let Some(days) = self.suspension_days {
            if self.decision != ModerationDecision::SuspendUser {
                return Err(ModlogError::InvalidArgument(format!(
                    "Suspension days only apply to SUSPEND_USER, not {}",
                    self.decision.as_str()
                )));
            }
            if days == 0 || days > max_suspension_days {
                return Err(ModlogError::InvalidArgument(format!(
                    "Suspension must be between 1 and {} days, got {}",
                    max_suspension_days, days
                )));
            }
        }

        Ok(())
    }
}

/// Builder for [`ModerationAction`]
pub struct ModerationActionBuilder {
    comment: CommentId,
    moderator: UserId,
    decision: ModerationDecision,
    scope: DecisionScope,
    scope_type_missing: bool,
    reason: Option<String>,
    new_content: Option<String>,
    notify_reporters: bool,
    escalate_to_platform: bool,
    suspension_days: Option<u32>,
    max_suspension_days: u32,
    expected_version: Option<u64>,
    project: Option<ProjectId>,
}

impl ModerationActionBuilder {
    pub fn new(comment: CommentId, moderator: UserId, decision: ModerationDecision) -> Self {
        Self {
            comment,
            moderator,
            decision,
            scope: DecisionScope::AllReports,
            scope_type_missing: false,
            reason: None,
            new_content: None,
            notify_reporters: false,
            escalate_to_platform: false,
            suspension_days: None,
            max_suspension_days: DEFAULT_MAX_SUSPENSION_DAYS,
            expected_version: None,
            project: None,
        }
    }

    pub fn scope(mut self, scope: DecisionScope) -> Self {
        self.scope = scope;
        self.scope_type_missing = false;
        self
    }

    /// Scope by name as entered on a form: "all", "type" or "single"
    pub fn scope_named(
        mut self,
        name: &str,
        report_type: Option<crate::report::ReportType>,
        report: Option<ReportId>,
    ) -> Result<Self> {
        let normalized = name.trim().to_ascii_uppercase().replace('-', "_");
        self.scope_type_missing = false;
        self.scope = match normalized.as_str() {
            "ALL" | "ALL_REPORTS" => DecisionScope::AllReports,
            "TYPE" | "REPORT_TYPE" => match report_type {
                Some(t) => DecisionScope::ReportType(t),
                None => {
                    self.scope_type_missing = true;
                    DecisionScope::AllReports
                }
            },
            "SINGLE" | "SINGLE_REPORT" => DecisionScope::SingleReport(report),
            _ => {
                return Err(ModlogError::InvalidArgument(format!(
                    "Unknown decision scope: {}",
                    name
                )))
            }
        };
        Ok(self)
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn new_content(mut self, content: impl Into<String>) -> Self {
        self.new_content = Some(content.into());
        self
    }

    pub fn notify_reporters(mut self, notify: bool) -> Self {
        self.notify_reporters = notify;
        self
    }

    pub fn escalate_to_platform(mut self, escalate: bool) -> Self {
        self.escalate_to_platform = escalate;
        self
    }

    pub fn suspension_days(mut self, days: u32) -> Self {
        self.suspension_days = Some(days);
        self
    }

    pub fn max_suspension_days(mut self, days: u32) -> Self {
        self.max_suspension_days = days;
        self
    }

    pub fn expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn project(mut self, project: Option<ProjectId>) -> Self {
        self.project = project;
        self
    }

    pub fn build(self) -> Result<ModerationAction> {
        if self.scope_type_missing {
            return Err(ModlogError::InvalidArgument(
                "Report type is required when applying to a specific report type".to_string(),
            ));
        }

        let now = Utc::now();
        let action = ModerationAction {
            id: ActionId::new(),
            comment: self.comment,
            moderator: self.moderator,
            decision: self.decision,
            scope: self.scope,
            reason: self
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            new_content: self.new_content,
            notify_reporters: self.notify_reporters,
            escalate_to_platform: self.escalate_to_platform,
            suspension_days: self.suspension_days,
            suspension_until: self
                .suspension_days
                .map(|days| now + Duration::days(i64::from(days))),
            expected_version: self.expected_version,
            project: self.project,
            previous_content: None,
            applied_content: None,
            affected_user: None,
            resolved_reports: Vec::new(),
            change: None,
            created_at: now,
        };
        action.validate(self.max_suspension_days)?;
        Ok(action)
    }
}
