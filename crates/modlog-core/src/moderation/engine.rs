//! Applies moderation actions to the board

use super::action::ModerationAction;
use super::decision::{DecisionScope, Outcome};
use crate::board::{Board, ThreadDeletionReport};
use crate::changelog::ChangeRecord;
use crate::config::ModerationConfig;
use crate::error::{ModlogError, Result};
use crate::notify::{Notification, NotificationKind};
use crate::types::{excerpt, ActionId, ChangeId, ReportId, UserId};
use tracing::info;

/// What applying an action changed
#[derive(Debug, Clone)]
pub struct AppliedDecision {
    pub action: ActionId,
    /// Changelog entry for the comment, if the comment changed
    pub change: Option<ChangeId>,
    pub resolved_reports: Vec<ReportId>,
    pub thread: Option<ThreadDeletionReport>,
    /// To be dispatched once the change is committed
    pub notifications: Vec<Notification>,
}

/// Executes moderation actions. Does not check the moderator's rights.
pub struct DecisionEngine<'a> {
    config: &'a ModerationConfig,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(config: &'a ModerationConfig) -> Self {
        Self { config }
    }

    /// Apply `action` to its comment and the reports in its scope, then
    /// record it on the board. Run inside [`Board::transaction`] so a
    /// failure leaves nothing half-applied.
    pub fn apply(&self, board: &mut Board, mut action: ModerationAction) -> Result<AppliedDecision> {
        action.validate(self.config.max_suspension_days)?;
        if board.actions.iter().any(|a| a.id == action.id) {
            return Err(ModlogError::InvalidArgument(format!(
                "Moderation action {} was already applied",
                action.id
            )));
        }

        let comment = board.comments.require(&action.comment)?;
        if let Some(expected) = action.expected_version {
            if comment.version != expected {
                return Err(ModlogError::Conflict {
                    comment: comment.id.to_string(),
                    expected,
                    actual: comment.version,
                });
            }
        }

        let previous_content = comment.content.clone();
        let previous_status = comment.status;
        let author = comment.author.user_id().cloned();
        let outcome = action
            .decision
            .outcome(comment, action.new_content.as_deref())?;

        let mut change = None;
        let mut thread = None;
        match outcome {
            Outcome::Transition(transition) => {
                let comment = board.comments.require_mut(&action.comment)?;
                transition.apply(
                    comment,
                    &action.moderator,
                    action.reason.as_deref(),
                    &self.config.removed_content_placeholder,
                );
                let new_content = comment.content.clone();
                let new_status = comment.status;
                let parent = comment.parent;

                change = Some(
                    board.changelog.log_change(
                        action.comment,
                        ChangeRecord::new(transition.change_type(), Some(&action.moderator))
                            .content(previous_content.clone(), new_content)
                            .status(previous_status, new_status)
                            .reason(action.reason.as_deref())
                            .action(Some(action.id))
                            .project(action.project.clone()),
                    )?,
                );

                if previous_status != new_status {
                    if let Some(parent) = parent {
                        board.comments.update_reply_count(parent);
                    }
                }
            }
            Outcome::DeleteThread => {
                let report = board.soft_delete_thread(
                    &action.comment,
                    &action.moderator,
                    action.reason.as_deref(),
                    Some(action.id),
                    action.project.clone(),
                )?;
                change = Some(report.root_change);
                thread = Some(report);
            }
            Outcome::Unchanged => {}
        }

        let resolved = self.resolve_reports(board, &action)?;

        if action.decision.is_user_level() {
            action.affected_user = author.clone();
        }

        let notifications = self.notifications(
            board,
            &action,
            &resolved,
            &previous_content,
            change.is_some(),
            author.as_ref(),
        );

        let comment = board.comments.require(&action.comment)?;
        action.previous_content = Some(previous_content);
        action.applied_content = Some(comment.content.clone());
        action.resolved_reports = resolved.clone();
        action.change = change;

        info!(
            "Applied {} to comment {} by {} ({} reports resolved)",
            action.decision.as_str(),
            action.comment,
            action.moderator,
            resolved.len()
        );
        if action.escalate_to_platform {
            info!("Comment {} escalated to platform moderation", action.comment);
        }

        let id = action.id;
        board.actions.push(action);

        Ok(AppliedDecision {
            action: id,
            change,
            resolved_reports: resolved,
            thread,
            notifications,
        })
    }

    /// Move the reports in scope to the decision's report status and
    /// refresh the comment's report group
    fn resolve_reports(&self, board: &mut Board, action: &ModerationAction) -> Result<Vec<ReportId>> {
        let targets = match action.scope {
            DecisionScope::AllReports => board.reports.active_for_comment(&action.comment, None),
            DecisionScope::ReportType(report_type) => board
                .reports
                .active_for_comment(&action.comment, Some(report_type)),
            DecisionScope::SingleReport(Some(id)) => {
                let report = board.reports.require(&id)?;
                if report.comment != action.comment {
                    return Err(ModlogError::InvalidArgument(format!(
                        "Report {} is not about comment {}",
                        id, action.comment
                    )));
                }
                vec![id]
            }
            DecisionScope::SingleReport(None) => Vec::new(),
        };

        let note = format!(
            "Resolved by moderation decision: {}",
            action.decision.label()
        );
        let status = action.decision.report_status();
        for id in &targets {
            board
                .reports
                .mark(id, status, &action.moderator, Some(&note))?;
        }
        board.reports.update_group(action.comment);
        Ok(targets)
    }

    fn notifications(
        &self,
        board: &Board,
        action: &ModerationAction,
        resolved: &[ReportId],
        reported_content: &str,
        comment_changed: bool,
        author: Option<&UserId>,
    ) -> Vec<Notification> {
        let mut notifications = Vec::new();

        if action.notify_reporters {
            let snippet = excerpt(reported_content, self.config.excerpt_length);
            for id in resolved {
                let Some(reporter) = board.reports.get(id).and_then(|r| r.reporter.clone()) else {
                    continue;
                };
                notifications.push(
                    Notification::new(
                        reporter,
                        NotificationKind::ReportResolved,
                        format!(
                            "Your report was reviewed. Decision: {}. Comment: \"{}\"",
                            action.decision.label(),
                            snippet
                        ),
                    )
                    .about(action.comment),
                );
            }
        }

        if self.config.notify_authors && comment_changed {
            if let Some(author) = author.filter(|a| **a != action.moderator) {
                notifications.push(
                    Notification::new(
                        author.clone(),
                        NotificationKind::CommentModerated,
                        format!(
                            "Your comment was {} by a moderator",
                            action.decision.past_tense()
                        ),
                    )
                    .about(action.comment),
                );
            }
        }

        notifications
    }
}
