//! The board: every entity of the moderation core in one aggregate
//!
//! Operations here keep the derived aggregates consistent (scores, reply
//! counts, report groups) and write the changelog. They do not check
//! permissions; that is the caller's job.

use crate::changelog::{ChangeLog, ChangeRecord, ChangeType};
use crate::comment::{Comment, CommentManager, CommentStatus, ParentRef};
use crate::error::{ModlogError, Result};
use crate::moderation::ModerationAction;
use crate::permission::ParentResolver;
use crate::report::{CommentReport, NewReport, ReportBook};
use crate::types::{ActionId, BulkOperationId, ChangeId, CommentId, ProjectId, ReportId, UserId};
use crate::vote::{VoteLedger, VoteType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    pub comments: CommentManager,
    #[serde(default)]
    pub votes: VoteLedger,
    #[serde(default)]
    pub reports: ReportBook,
    #[serde(default)]
    pub changelog: ChangeLog,
    /// Applied moderation actions, in application order
    #[serde(default)]
    pub actions: Vec<ModerationAction>,
}

/// Result of a thread deletion
#[derive(Debug, Clone)]
pub struct ThreadDeletionReport {
    pub root: CommentId,
    /// Entry written for the root
    pub root_change: ChangeId,
    /// Shared by the root entry and every reply entry; `None` with no replies affected
    pub bulk_operation: Option<BulkOperationId>,
    /// Replies moved to REPLY_TO_DELETED
    pub affected: Vec<CommentId>,
}

/// Result of a physical subtree removal
#[derive(Debug, Clone)]
pub struct RemovalReport {
    pub comments: Vec<CommentId>,
    pub votes: usize,
    pub reports: usize,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` atomically: on error the board is restored to its prior state
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Board) -> Result<T>) -> Result<T> {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                *self = snapshot;
                Err(err)
            }
        }
    }

    /// Project governing a comment. Comment attachments are followed
    /// through the referenced comment.
    pub fn project_for(&self, comment: &Comment, parents: &dyn ParentResolver) -> Option<ProjectId> {
        let mut seen = HashSet::from([comment.id]);
        let mut current = &comment.parent_ref;
        loop {
            match current {
                ParentRef::Comment(id) => {
                    if !seen.insert(*id) {
                        return None;
                    }
                    current = &self.comments.get(id)?.parent_ref;
                }
                other => return parents.project_for(other),
            }
        }
    }

    /// Store a new comment and refresh the parent chain's reply counts
    pub fn add_comment(&mut self, comment: Comment) -> Result<CommentId> {
        self.comments.add(comment)
    }

    /// Plain edit path. Logged as USER_EDIT when the author edits, else
    /// MODERATOR_EDIT.
    pub fn edit_comment(
        &mut self,
        id: &CommentId,
        new_content: &str,
        editor: Option<&UserId>,
        project: Option<ProjectId>,
    ) -> Result<ChangeId> {
        let comment = self.comments.require_mut(id)?;
        let by_author = match editor {
            Some(editor) => comment.author.user_id() == Some(editor),
            None => true,
        };
        let previous = comment.edit(new_content, editor);
        let status = comment.status;

        let change_type = if by_author {
            ChangeType::UserEdit
        } else {
            ChangeType::ModeratorEdit
        };
        self.changelog.log_change(
            *id,
            ChangeRecord::new(change_type, editor)
                .content(previous, new_content)
                .status(status, status)
                .project(project),
        )
    }

    /// Create or switch the user's vote and recount the score
    pub fn cast_vote(&mut self, id: &CommentId, user: &UserId, vote_type: VoteType) -> Result<i64> {
        self.comments.require(id)?;
        self.votes.cast(*id, user, vote_type);
        self.refresh_score(id)
    }

    /// Remove the user's vote and recount the score
    pub fn remove_vote(&mut self, id: &CommentId, user: &UserId) -> Result<i64> {
        self.comments.require(id)?;
        self.votes.remove(*id, user)?;
        self.refresh_score(id)
    }

    /// Full recount of a comment's score
    pub fn refresh_score(&mut self, id: &CommentId) -> Result<i64> {
        let score = self.votes.score(id);
        self.comments.require_mut(id)?.set_score(score);
        Ok(score)
    }

    pub fn file_report(
        &mut self,
        id: &CommentId,
        report: NewReport,
        project: Option<ProjectId>,
    ) -> Result<ReportId> {
        let comment = self.comments.require(id)?;
        self.reports.file(comment, report, project)
    }

    /// Reports on a comment, newest first
    pub fn reports_for(&self, id: &CommentId) -> Vec<&CommentReport> {
        self.reports.for_comment(id)
    }

    /// Mark `root` THREAD_DELETED and cascade to its APPROVED replies,
    /// writing the root entry plus one entry per affected reply.
    pub fn soft_delete_thread(
        &mut self,
        root: &CommentId,
        moderator: &UserId,
        reason: Option<&str>,
        action: Option<ActionId>,
        project: Option<ProjectId>,
    ) -> Result<ThreadDeletionReport> {
        let previous_content = self.comments.require(root)?.content.clone();
        let deletion = self.comments.soft_delete_thread(*root, moderator, reason)?;
        let affected = deletion.cascaded.len();
        let bulk = (affected > 0).then(BulkOperationId::new);

        let mut record = ChangeRecord::new(
            if bulk.is_some() {
                ChangeType::BulkThreadDeletion
            } else {
                ChangeType::ThreadDeletion
            },
            Some(moderator),
        )
        .content(previous_content.clone(), previous_content)
        .status(deletion.root_previous_status, CommentStatus::ThreadDeleted)
        .reason(reason)
        .action(action)
        .project(project.clone());
        if let Some(bulk) = bulk {
            record = record.bulk(bulk, affected);
        }
        let root_change = self.changelog.log_change(*root, record)?;

        for reply in &deletion.cascaded {
            let mut record = ChangeRecord::new(ChangeType::StatusChange, Some(moderator))
                .status(reply.previous_status, CommentStatus::ReplyToDeleted)
                .reason(reason)
                .action(action)
                .project(project.clone());
            if let Some(bulk) = bulk {
                record = record.bulk(bulk, 0);
            }
            self.changelog.log_change(reply.id, record)?;
        }

        info!(
            "Deleted thread {} by {} ({} replies hidden)",
            root, moderator, affected
        );

        Ok(ThreadDeletionReport {
            root: *root,
            root_change,
            bulk_operation: bulk,
            affected: deletion.cascaded.into_iter().map(|c| c.id).collect(),
        })
    }

    /// Physically delete a comment subtree with its votes and reports.
    /// Changelog entries are kept.
    pub fn remove_comment(&mut self, id: &CommentId) -> Result<RemovalReport> {
        let removed = self.comments.remove(id)?;
        let mut report = RemovalReport {
            comments: Vec::with_capacity(removed.len()),
            votes: 0,
            reports: 0,
        };
        for comment in &removed {
            report.votes += self.votes.remove_comment(&comment.id);
            report.reports += self.reports.remove_comment(&comment.id);
            report.comments.push(comment.id);
        }
        info!(
            "Removed {} comments ({} votes, {} reports)",
            report.comments.len(),
            report.votes,
            report.reports
        );
        Ok(report)
    }

    pub fn action(&self, id: &ActionId) -> Result<&ModerationAction> {
        self.actions
            .iter()
            .find(|a| a.id == *id)
            .ok_or_else(|| ModlogError::ActionNotFound(id.to_string()))
    }

    /// Actions applied to a comment, newest first
    pub fn actions_for(&self, comment: &CommentId) -> Vec<&ModerationAction> {
        self.actions
            .iter()
            .rev()
            .filter(|a| a.comment == *comment)
            .collect()
    }

    /// Derived aggregates that disagree with a recount
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for comment in self.comments.all_sorted() {
            let replies = self.comments.approved_reply_count(&comment.id);
            if comment.total_replies != replies {
                violations.push(format!(
                    "comment {} has total_replies {} but {} approved replies",
                    comment.id, comment.total_replies, replies
                ));
            }
            let score = self.votes.score(&comment.id);
            if comment.score != score {
                violations.push(format!(
                    "comment {} has score {} but votes add up to {}",
                    comment.id, comment.score, score
                ));
            }
            let reports = self.reports.for_comment(&comment.id).len();
            match self.reports.group(&comment.id) {
                Some(group) if group.total_reports != reports => violations.push(format!(
                    "comment {} report group counts {} of {} reports",
                    comment.id, group.total_reports, reports
                )),
                None if reports > 0 => violations.push(format!(
                    "comment {} has {} reports but no report group",
                    comment.id, reports
                )),
                _ => {}
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::{Author, CommentBuilder};
    use crate::permission::StaticParentResolver;
    use crate::report::ReportType;

    fn top_level(board: &mut Board, author: &str) -> CommentId {
        let comment = CommentBuilder::new(Author::user(author))
            .content("Root")
            .on_task("t1")
            .build()
            .unwrap();
        board.add_comment(comment).unwrap()
    }

    fn reply(board: &mut Board, parent: CommentId, author: &str) -> CommentId {
        let comment = CommentBuilder::new(Author::user(author))
            .content("Reply")
            .reply_to(board.comments.get(&parent).unwrap())
            .build()
            .unwrap();
        board.add_comment(comment).unwrap()
    }

    #[test]
    fn test_transaction_rolls_back() {
        let mut board = Board::new();
        let id = top_level(&mut board, "alice");

        let result: Result<()> = board.transaction(|b| {
            b.cast_vote(&id, &UserId::from_string("bob"), VoteType::Upvote)?;
            Err(ModlogError::InvalidArgument("abort".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(board.comments.get(&id).unwrap().score, 0);
        assert_eq!(board.votes.count(), 0);
    }

    #[test]
    fn test_project_for_follows_comment_refs() {
        let mut board = Board::new();
        let parents = StaticParentResolver::new().with_task("t1", "p9");
        let root = top_level(&mut board, "alice");

        let linked = CommentBuilder::new(Author::user("bob"))
            .content("See above")
            .on_comment(root)
            .build()
            .unwrap();
        let linked = board.add_comment(linked).unwrap();

        let project = board.project_for(board.comments.get(&linked).unwrap(), &parents);
        assert_eq!(project, Some(ProjectId::from_string("p9")));
    }

    #[test]
    fn test_votes_keep_score_in_sync() {
        let mut board = Board::new();
        let id = top_level(&mut board, "alice");
        let user = UserId::from_string("u");

        assert_eq!(board.cast_vote(&id, &user, VoteType::Upvote).unwrap(), 1);
        assert_eq!(board.cast_vote(&id, &user, VoteType::Downvote).unwrap(), -1);
        assert_eq!(board.votes.count(), 1);
        assert_eq!(board.remove_vote(&id, &user).unwrap(), 0);
        assert!(board.remove_vote(&id, &user).unwrap_err().is_not_found());
        assert!(board.invariant_violations().is_empty());
    }

    #[test]
    fn test_edit_logs_user_and_moderator_edits() {
        let mut board = Board::new();
        let id = top_level(&mut board, "alice");

        board
            .edit_comment(&id, "Fixed typo", Some(&UserId::from_string("alice")), None)
            .unwrap();
        board
            .edit_comment(&id, "Cleaned", Some(&UserId::from_string("mod")), None)
            .unwrap();

        let history = board.changelog.history(&id, true);
        assert_eq!(history[0].change_type, ChangeType::ModeratorEdit);
        assert_eq!(history[1].change_type, ChangeType::UserEdit);
        assert_eq!(
            board.changelog.original_content(board.comments.get(&id).unwrap()),
            "Root"
        );
    }

    #[test]
    fn test_thread_deletion_fan_out() {
        let mut board = Board::new();
        let moderator = UserId::from_string("mod");
        let r = top_level(&mut board, "alice");
        let a = reply(&mut board, r, "bob");
        let b = reply(&mut board, r, "carol");
        let a1 = reply(&mut board, a, "dave");

        let report = board
            .soft_delete_thread(&r, &moderator, Some("derailed"), None, None)
            .unwrap();

        assert_eq!(report.affected, vec![a, a1, b]);
        let bulk = report.bulk_operation.unwrap();
        let entries = board.changelog.entries_for_bulk_operation(&bulk);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].change_type, ChangeType::BulkThreadDeletion);
        assert_eq!(entries[0].affected_children_count, 3);
        assert!(entries[1..]
            .iter()
            .all(|e| e.change_type == ChangeType::StatusChange
                && e.new_status == Some(CommentStatus::ReplyToDeleted)));
        assert!(board.invariant_violations().is_empty());
    }

    #[test]
    fn test_thread_deletion_without_replies() {
        let mut board = Board::new();
        let r = top_level(&mut board, "alice");

        let report = board
            .soft_delete_thread(&r, &UserId::from_string("mod"), None, None, None)
            .unwrap();

        assert!(report.bulk_operation.is_none());
        let entry = board.changelog.get(&report.root_change).unwrap();
        assert_eq!(entry.change_type, ChangeType::ThreadDeletion);
        assert_eq!(entry.affected_children_count, 0);
    }

    #[test]
    fn test_remove_comment_drops_votes_and_reports() {
        let mut board = Board::new();
        let r = top_level(&mut board, "alice");
        let a = reply(&mut board, r, "bob");
        board
            .cast_vote(&a, &UserId::from_string("u"), VoteType::Upvote)
            .unwrap();
        board
            .file_report(
                &a,
                NewReport {
                    reporter: Some(UserId::from_string("u")),
                    report_type: ReportType::Spam,
                    description: None,
                },
                None,
            )
            .unwrap();
        board
            .edit_comment(&a, "edited", Some(&UserId::from_string("bob")), None)
            .unwrap();

        let removal = board.remove_comment(&a).unwrap();

        assert_eq!(removal.comments, vec![a]);
        assert_eq!(removal.votes, 1);
        assert_eq!(removal.reports, 1);
        assert!(board.reports.group(&a).is_none());
        assert_eq!(board.comments.get(&r).unwrap().total_replies, 0);
        assert_eq!(board.changelog.change_count(&a), 1);
        assert!(board.invariant_violations().is_empty());
    }

    #[test]
    fn test_board_serialization() {
        let mut board = Board::new();
        let r = top_level(&mut board, "alice");
        reply(&mut board, r, "bob");

        let json = serde_json::to_string(&board).unwrap();
        let restored: Board = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.comments.replies(&r).len(), 1);
        assert!(restored.invariant_violations().is_empty());
    }
}
