//! Report storage and group maintenance

use super::group::{CommentReportGroup, GroupQuery, GroupStats};
use super::model::{CommentReport, ReportStatus, ReportType};
use crate::comment::Comment;
use crate::error::{ModlogError, Result};
use crate::types::{CommentId, ProjectId, ReportId, UserId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// A report as submitted by a reader
#[derive(Debug, Clone)]
pub struct NewReport {
    pub reporter: Option<UserId>,
    pub report_type: ReportType,
    pub description: Option<String>,
}

/// All comment reports plus their per-comment groups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportBook {
    reports: HashMap<ReportId, CommentReport>,
    groups: HashMap<CommentId, CommentReportGroup>,
    #[serde(default)]
    next_sequence: u64,
}

impl ReportBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a report against `comment` and refresh its group.
    ///
    /// Authors cannot report their own comment, and a reporter may hold at
    /// most one active report per comment.
    pub fn file(
        &mut self,
        comment: &Comment,
        report: NewReport,
        project: Option<ProjectId>,
    ) -> Result<ReportId> {
        if let Some(reporter) = &report.reporter {
            if comment.author.user_id() == Some(reporter) {
                return Err(ModlogError::InvalidArgument(
                    "You cannot report your own comment".to_string(),
                ));
            }
            let duplicate = self.reports.values().any(|existing| {
                existing.comment == comment.id
                    && existing.reporter.as_ref() == Some(reporter)
                    && existing.status.is_active()
            });
            if duplicate {
                return Err(ModlogError::InvalidArgument(format!(
                    "{} has already reported comment {}",
                    reporter, comment.id
                )));
            }
        }

        self.next_sequence += 1;
        let now = Utc::now();
        let filed = CommentReport {
            id: ReportId::new(),
            comment: comment.id,
            reporter: report.reporter,
            reported_user: comment.author.user_id().cloned(),
            report_type: report.report_type,
            description: report
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            status: ReportStatus::Pending,
            reviewed_by: None,
            moderator_notes: None,
            project,
            created_at: now,
            updated_at: now,
            sequence: self.next_sequence,
        };
        let id = filed.id;
        self.reports.insert(id, filed);
        self.update_group(comment.id);
        Ok(id)
    }

    pub fn get(&self, id: &ReportId) -> Option<&CommentReport> {
        self.reports.get(id)
    }

    pub fn require(&self, id: &ReportId) -> Result<&CommentReport> {
        self.reports
            .get(id)
            .ok_or_else(|| ModlogError::ReportNotFound(id.to_string()))
    }

    /// Update a report's status without touching its group.
    /// Callers batch several marks and refresh the group once.
    pub fn mark(
        &mut self,
        id: &ReportId,
        status: ReportStatus,
        moderator: &UserId,
        note: Option<&str>,
    ) -> Result<&CommentReport> {
        let report = self
            .reports
            .get_mut(id)
            .ok_or_else(|| ModlogError::ReportNotFound(id.to_string()))?;
        report.mark(status, moderator, note);
        Ok(report)
    }

    /// Moderator review of a single report; refreshes the group
    pub fn review(
        &mut self,
        id: &ReportId,
        status: ReportStatus,
        moderator: &UserId,
        notes: Option<&str>,
    ) -> Result<CommentReport> {
        if status == ReportStatus::Pending {
            return Err(ModlogError::InvalidArgument(
                "A review must move the report out of PENDING".to_string(),
            ));
        }
        let report = self.mark(id, status, moderator, notes)?.clone();
        self.update_group(report.comment);
        Ok(report)
    }

    /// Delete a report; refreshes (or drops) the group
    pub fn delete(&mut self, id: &ReportId) -> Result<CommentReport> {
        let report = self
            .reports
            .remove(id)
            .ok_or_else(|| ModlogError::ReportNotFound(id.to_string()))?;
        self.update_group(report.comment);
        Ok(report)
    }

    /// Reports on a comment, newest first
    pub fn for_comment(&self, comment: &CommentId) -> Vec<&CommentReport> {
        let mut reports: Vec<_> = self
            .reports
            .values()
            .filter(|r| r.comment == *comment)
            .collect();
        reports.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.sequence.cmp(&a.sequence))
        });
        reports
    }

    /// PENDING or REVIEWED reports on a comment, optionally of one type
    pub fn active_for_comment(
        &self,
        comment: &CommentId,
        report_type: Option<ReportType>,
    ) -> Vec<ReportId> {
        self.for_comment(comment)
            .into_iter()
            .filter(|r| r.status.is_active())
            .filter(|r| report_type.map_or(true, |t| r.report_type == t))
            .map(|r| r.id)
            .collect()
    }

    /// Recompute the group for `comment`; removes it when no reports remain
    pub fn update_group(&mut self, comment: CommentId) -> Option<&CommentReportGroup> {
        let computed = CommentReportGroup::compute(
            comment,
            self.reports.values().filter(|r| r.comment == comment),
        );
        match computed {
            Some(group) => {
                debug!(
                    "Report group for {}: {} reports, {}",
                    comment, group.total_reports, group.status
                );
                self.groups.insert(comment, group);
                self.groups.get(&comment)
            }
            None => {
                self.groups.remove(&comment);
                None
            }
        }
    }

    pub fn group(&self, comment: &CommentId) -> Option<&CommentReportGroup> {
        self.groups.get(comment)
    }

    /// Recompute every group from scratch. Returns the number of groups.
    pub fn rebuild_groups(&mut self) -> usize {
        let comments: BTreeSet<CommentId> = self.reports.values().map(|r| r.comment).collect();
        self.groups.clear();
        for comment in &comments {
            self.update_group(*comment);
        }
        self.groups.len()
    }

    /// Groups matching `query`, in its order
    pub fn groups(&self, query: &GroupQuery) -> Vec<&CommentReportGroup> {
        let mut groups: Vec<_> = self.groups.values().filter(|g| query.matches(g)).collect();
        groups.sort_by(|a, b| query.compare(a, b));
        groups
    }

    pub fn stats(&self, high_priority_threshold: usize) -> GroupStats {
        GroupStats {
            total_groups: self.groups.len(),
            pending_groups: self
                .groups
                .values()
                .filter(|g| g.status == ReportStatus::Pending)
                .count(),
            high_priority: self
                .groups
                .values()
                .filter(|g| g.is_high_priority(high_priority_threshold))
                .count(),
        }
    }

    /// Drop every report and the group of a comment. Returns the report count.
    pub fn remove_comment(&mut self, comment: &CommentId) -> usize {
        let before = self.reports.len();
        self.reports.retain(|_, r| r.comment != *comment);
        self.groups.remove(comment);
        before - self.reports.len()
    }

    pub fn count(&self) -> usize {
        self.reports.len()
    }
}
