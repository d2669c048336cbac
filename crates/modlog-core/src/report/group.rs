//! Per-comment report aggregate

use super::model::{CommentReport, ReportStatus, ReportType};
use crate::error::{ModlogError, Result};
use crate::types::{CommentId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Derived summary of every report on one comment.
///
/// Always recomputed from the reports; never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentReportGroup {
    pub comment: CommentId,
    #[serde(default)]
    pub project: Option<ProjectId>,
    pub total_reports: usize,
    /// Counts per type; zero counts are omitted
    pub report_types_summary: BTreeMap<ReportType, usize>,
    pub first_reported_at: DateTime<Utc>,
    pub last_reported_at: DateTime<Utc>,
    /// Worst-case rollup of the report statuses
    pub status: ReportStatus,
}

impl CommentReportGroup {
    /// Aggregate `reports`, or `None` when there are none
    pub fn compute<'a>(
        comment: CommentId,
        reports: impl IntoIterator<Item = &'a CommentReport>,
    ) -> Option<Self> {
        let mut total = 0;
        let mut summary = BTreeMap::new();
        let mut first: Option<DateTime<Utc>> = None;
        let mut last: Option<(DateTime<Utc>, u64)> = None;
        let mut project = None;
        let mut project_at: Option<(DateTime<Utc>, u64)> = None;
        let mut any_pending = false;
        let mut any_reviewed = false;

        for report in reports {
            total += 1;
            *summary.entry(report.report_type).or_insert(0) += 1;

            first = Some(first.map_or(report.created_at, |f| f.min(report.created_at)));
            let key = (report.created_at, report.sequence);
            if last.map_or(true, |l| key > l) {
                last = Some(key);
            }
            // Latest report carrying a project wins
            if report.project.is_some() && project_at.map_or(true, |at| key > at) {
                project = report.project.clone();
                project_at = Some(key);
            }

            match report.status {
                ReportStatus::Pending => any_pending = true,
                ReportStatus::Reviewed => any_reviewed = true,
                ReportStatus::Rejected | ReportStatus::Resolved => {}
            }
        }

        let (first, (last, _)) = (first?, last?);
        let status = if any_pending {
            ReportStatus::Pending
        } else if any_reviewed {
            ReportStatus::Reviewed
        } else {
            ReportStatus::Resolved
        };

        Some(Self {
            comment,
            project,
            total_reports: total,
            report_types_summary: summary,
            first_reported_at: first,
            last_reported_at: last,
            status,
        })
    }

    /// At or above the configured report count
    pub fn is_high_priority(&self, threshold: usize) -> bool {
        self.total_reports >= threshold
    }
}

/// Sort key for group listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupSort {
    TotalReports,
    FirstReported,
    #[default]
    LastReported,
}

impl FromStr for GroupSort {
    type Err = ModlogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "total" | "total_reports" => Ok(GroupSort::TotalReports),
            "first" | "first_reported" => Ok(GroupSort::FirstReported),
            "last" | "last_reported" => Ok(GroupSort::LastReported),
            _ => Err(ModlogError::InvalidArgument(format!("Unknown sort key: {}", s))),
        }
    }
}

/// Filter and ordering for [`ReportBook::groups`](super::ReportBook::groups)
#[derive(Debug, Clone)]
pub struct GroupQuery {
    pub status: Option<ReportStatus>,
    pub report_type: Option<ReportType>,
    pub project: Option<ProjectId>,
    pub sort: GroupSort,
    pub descending: bool,
}

impl Default for GroupQuery {
    fn default() -> Self {
        Self {
            status: None,
            report_type: None,
            project: None,
            sort: GroupSort::LastReported,
            descending: true,
        }
    }
}

impl GroupQuery {
    pub fn matches(&self, group: &CommentReportGroup) -> bool {
        self.status.map_or(true, |s| group.status == s)
            && self
                .report_type
                .map_or(true, |t| group.report_types_summary.contains_key(&t))
            && self
                .project
                .as_ref()
                .map_or(true, |p| group.project.as_ref() == Some(p))
    }

    pub fn compare(&self, a: &CommentReportGroup, b: &CommentReportGroup) -> Ordering {
        let ordering = match self.sort {
            GroupSort::TotalReports => a.total_reports.cmp(&b.total_reports),
            GroupSort::FirstReported => a.first_reported_at.cmp(&b.first_reported_at),
            GroupSort::LastReported => a.last_reported_at.cmp(&b.last_reported_at),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Dashboard counters over all groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub total_groups: usize,
    pub pending_groups: usize,
    pub high_priority: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReportId, UserId};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn report(
        comment: CommentId,
        report_type: ReportType,
        status: ReportStatus,
        minutes_ago: i64,
    ) -> CommentReport {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        CommentReport {
            id: ReportId::new(),
            comment,
            reporter: Some(UserId::from_string("r")),
            reported_user: None,
            report_type,
            description: None,
            status,
            reviewed_by: None,
            moderator_notes: None,
            project: Some(ProjectId::from_string("p1")),
            created_at: at,
            updated_at: at,
            sequence: 0,
        }
    }

    #[test]
    fn test_compute_empty_is_none() {
        assert!(CommentReportGroup::compute(CommentId::new(), []).is_none());
    }

    #[test]
    fn test_compute_summary() {
        let comment = CommentId::new();
        let reports = vec![
            report(comment, ReportType::Spam, ReportStatus::Pending, 30),
            report(comment, ReportType::Spam, ReportStatus::Resolved, 20),
            report(comment, ReportType::Harassment, ReportStatus::Reviewed, 10),
        ];

        let group = CommentReportGroup::compute(comment, &reports).unwrap();

        assert_eq!(group.total_reports, 3);
        assert_eq!(
            group.report_types_summary,
            BTreeMap::from([(ReportType::Spam, 2), (ReportType::Harassment, 1)])
        );
        assert_eq!(group.first_reported_at, reports[0].created_at);
        assert_eq!(group.last_reported_at, reports[2].created_at);
        assert_eq!(group.status, ReportStatus::Pending);
    }

    #[test]
    fn test_status_rollup() {
        let comment = CommentId::new();
        let reviewed = vec![
            report(comment, ReportType::Spam, ReportStatus::Reviewed, 2),
            report(comment, ReportType::Spam, ReportStatus::Rejected, 1),
        ];
        assert_eq!(
            CommentReportGroup::compute(comment, &reviewed).unwrap().status,
            ReportStatus::Reviewed
        );

        let closed = vec![
            report(comment, ReportType::Spam, ReportStatus::Resolved, 2),
            report(comment, ReportType::Spam, ReportStatus::Rejected, 1),
        ];
        assert_eq!(
            CommentReportGroup::compute(comment, &closed).unwrap().status,
            ReportStatus::Resolved
        );
    }

    #[test]
    fn test_compute_is_idempotent() {
        let comment = CommentId::new();
        let reports = vec![
            report(comment, ReportType::Other, ReportStatus::Pending, 5),
            report(comment, ReportType::OffTopic, ReportStatus::Pending, 1),
        ];

        assert_eq!(
            CommentReportGroup::compute(comment, &reports),
            CommentReportGroup::compute(comment, &reports)
        );
    }

    #[test]
    fn test_query_filter_and_sort() {
        let a = CommentId::new();
        let b = CommentId::new();
        let group_a = CommentReportGroup::compute(
            a,
            &[
                report(a, ReportType::Spam, ReportStatus::Pending, 50),
                report(a, ReportType::Spam, ReportStatus::Pending, 40),
            ],
        )
        .unwrap();
        let group_b = CommentReportGroup::compute(
            b,
            &[report(b, ReportType::Harassment, ReportStatus::Resolved, 5)],
        )
        .unwrap();

        let query = GroupQuery::default();
        assert_eq!(query.compare(&group_b, &group_a), Ordering::Less);

        let by_total = GroupQuery {
            sort: GroupSort::TotalReports,
            ..GroupQuery::default()
        };
        assert_eq!(by_total.compare(&group_a, &group_b), Ordering::Less);

        let spam_only = GroupQuery {
            report_type: Some(ReportType::Spam),
            ..GroupQuery::default()
        };
        assert!(spam_only.matches(&group_a));
        assert!(!spam_only.matches(&group_b));

        let pending = GroupQuery {
            status: Some(ReportStatus::Pending),
            project: Some(ProjectId::from_string("p1")),
            ..GroupQuery::default()
        };
        assert!(pending.matches(&group_a));
        assert!(!pending.matches(&group_b));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("total".parse::<GroupSort>().unwrap(), GroupSort::TotalReports);
        assert_eq!(
            "first-reported".parse::<GroupSort>().unwrap(),
            GroupSort::FirstReported
        );
        assert!("oldest".parse::<GroupSort>().is_err());
    }
}
