//! Transactional entry points for the web layer
//!
//! Every mutation locks the board, runs inside [`Board::transaction`] and is
//! persisted before the lock is released. A failed step or a failed save
//! restores the board. Notifications go out only after the commit.

use crate::board::{Board, RemovalReport, ThreadDeletionReport};
use crate::changelog::{ChangeLogEntry, HistorySummary};
use crate::comment::{Author, Comment, CommentBuilder, CommentStatus, CommentValidator, ParentRef};
use crate::config::{Config, ModerationConfig};
use crate::error::{ModlogError, Result};
use crate::moderation::{AppliedDecision, DecisionEngine, ModerationAction, ModerationDecision};
use crate::notify::{Notification, NotificationKind, NotificationSink, TracingNotifier};
use crate::permission::{
    self, ModeratorLevel, ParentResolver, PermissionResolver, StaticParentResolver,
    StaticPermissions,
};
use crate::report::{
    CommentReport, CommentReportGroup, GroupQuery, GroupStats, NewReport, ReportStatus,
};
use crate::store::BoardStorage;
use crate::types::{Actor, CommentId, ProjectId, ReportId, UserId};
use crate::vote::{CommentVote, VoteType};
use anyhow::anyhow;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// A comment as submitted
#[derive(Debug, Clone)]
pub struct NewComment {
    pub author: Author,
    pub content: String,
    /// Entity to attach to; replies may leave this `None` to inherit
    pub attach: ParentRef,
    pub reply_to: Option<CommentId>,
    pub ip_address: Option<String>,
}

impl NewComment {
    pub fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            author,
            content: content.into(),
            attach: ParentRef::None,
            reply_to: None,
            ip_address: None,
        }
    }

    pub fn attach(mut self, parent_ref: ParentRef) -> Self {
        self.attach = parent_ref;
        self
    }

    pub fn reply_to(mut self, parent: CommentId) -> Self {
        self.reply_to = Some(parent);
        self
    }
}

/// The comment moderation core behind one lock
pub struct CommentService {
    board: Mutex<Board>,
    storage: Arc<dyn BoardStorage>,
    permissions: Arc<dyn PermissionResolver>,
    parents: Arc<dyn ParentResolver>,
    notifier: Arc<dyn NotificationSink>,
    moderation: ModerationConfig,
    validator: CommentValidator,
}

impl CommentService {
    /// Load the board from `storage`. Permissions and parent context come
    /// from `config`; notifications go to the log.
    pub fn open(storage: Arc<dyn BoardStorage>, config: &Config) -> Result<Self> {
        let board = storage.load_or_default()?;
        debug!("Opened board with {} comments", board.comments.count());
        Ok(Self {
            board: Mutex::new(board),
            storage,
            permissions: Arc::new(StaticPermissions::from_config(&config.permissions)),
            parents: Arc::new(StaticParentResolver::from_config(&config.context)),
            notifier: Arc::new(TracingNotifier),
            moderation: config.moderation.clone(),
            validator: CommentValidator::from_config(&config.validation),
        })
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionResolver>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_parents(mut self, parents: Arc<dyn ParentResolver>) -> Self {
        self.parents = parents;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn moderation_config(&self) -> &ModerationConfig {
        &self.moderation
    }

    fn lock(&self) -> Result<MutexGuard<'_, Board>> {
        self.board
            .lock()
            .map_err(|_| ModlogError::Internal(anyhow!("board lock poisoned")))
    }

    /// Run `f` as one unit of work and persist the result
    fn mutate<T>(&self, f: impl FnOnce(&mut Board) -> Result<T>) -> Result<T> {
        let mut board = self.lock()?;
        let _held = self.storage.lock()?;
        // Another writer may have saved since this board was loaded
        *board = self.storage.load_or_default()?;
        board.transaction(|b| {
            let value = f(b)?;
            self.storage
                .save(b)
                .map_err(|e| e.with_context("Failed to persist board"))?;
            Ok(value)
        })
    }

    /// Read-only access to the board
    pub fn read<T>(&self, f: impl FnOnce(&Board) -> T) -> Result<T> {
        let board = self.lock()?;
        Ok(f(&board))
    }

    fn dispatch(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            if let Err(e) = self.notifier.notify(&notification) {
                warn!(
                    "Failed to notify {} ({}): {}",
                    notification.recipient, notification.kind, e
                );
            }
        }
    }

    fn project_of(&self, board: &Board, comment: &Comment) -> Option<ProjectId> {
        board.project_for(comment, self.parents.as_ref())
    }

    // ---- comments ----

    /// Create a top-level comment or a reply
    pub fn create_comment(&self, new: NewComment) -> Result<Comment> {
        self.validator.validate_content(&new.content)?;
        let initial = if self.moderation.pre_moderation {
            CommentStatus::Pending
        } else {
            CommentStatus::Approved
        };

        let (comment, notification) = self.mutate(|board| {
            let mut builder = CommentBuilder::new(new.author)
                .content(new.content)
                .attach(new.attach)
                .status(initial);
            if let Some(ip) = new.ip_address {
                builder = builder.ip_address(ip);
            }

            let mut notification = None;
            if let Some(parent_id) = new.reply_to {
                let parent = board.comments.require(&parent_id)?;
                builder = builder.reply_to(parent);
                notification = parent.author.user_id().cloned();
            }

            let comment = builder.build()?;
            self.validator.validate(&comment)?;
            if comment.parent_ref.is_none() {
                return Err(ModlogError::InvalidArgument(
                    "A comment must be attached to an entity".to_string(),
                ));
            }

            let notification = notification
                .filter(|recipient| comment.author.user_id() != Some(recipient))
                .map(|recipient| {
                    Notification::new(
                        recipient,
                        NotificationKind::Reply,
                        format!("{} replied to your comment", comment.display_author()),
                    )
                    .about(comment.id)
                });

            board.add_comment(comment.clone())?;
            let stored = board.comments.require(&comment.id)?.clone();
            Ok((stored, notification))
        })?;

        self.dispatch(notification.into_iter().collect());
        Ok(comment)
    }

    /// Replace a comment's content through the plain edit path
    pub fn edit_comment(&self, id: &CommentId, editor: Option<&UserId>, content: &str) -> Result<Comment> {
        self.validator.validate_content(content)?;
        self.mutate(|board| {
            let project = self.project_of(board, board.comments.require(id)?);
            board.edit_comment(id, content, editor, project)?;
            Ok(board.comments.require(id)?.clone())
        })
    }

    pub fn comment(&self, id: &CommentId) -> Result<Comment> {
        self.read(|board| board.comments.require(id).cloned())?
    }

    /// Top-level comments on an entity, newest first
    pub fn top_level(&self, parent_ref: &ParentRef) -> Result<Vec<Comment>> {
        self.read(|board| {
            board
                .comments
                .top_level(parent_ref)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// Direct replies, oldest first
    pub fn replies(&self, id: &CommentId) -> Result<Vec<Comment>> {
        self.read(|board| {
            board.comments.require(id)?;
            Ok(board.comments.replies(id).into_iter().cloned().collect())
        })?
    }

    /// Physically delete a comment subtree with its votes and reports
    pub fn remove_comment(&self, id: &CommentId) -> Result<RemovalReport> {
        self.mutate(|board| board.remove_comment(id))
    }

    // ---- votes ----

    pub fn cast_vote(&self, id: &CommentId, user: &UserId, vote_type: VoteType) -> Result<Comment> {
        self.mutate(|board| {
            board.cast_vote(id, user, vote_type)?;
            Ok(board.comments.require(id)?.clone())
        })
    }

    pub fn remove_vote(&self, id: &CommentId, user: &UserId) -> Result<Comment> {
        self.mutate(|board| {
            board.remove_vote(id, user)?;
            Ok(board.comments.require(id)?.clone())
        })
    }

    pub fn user_vote(&self, id: &CommentId, user: &UserId) -> Result<Option<CommentVote>> {
        self.read(|board| {
            board.comments.require(id)?;
            Ok(board.votes.user_vote(id, user).cloned())
        })?
    }

    // ---- reports ----

    pub fn file_report(&self, id: &CommentId, report: NewReport) -> Result<CommentReport> {
        self.mutate(|board| {
            let project = self.project_of(board, board.comments.require(id)?);
            let report_id = board.file_report(id, report, project)?;
            Ok(board.reports.require(&report_id)?.clone())
        })
    }

    pub fn review_report(
        &self,
        id: &ReportId,
        status: ReportStatus,
        moderator: &UserId,
        notes: Option<&str>,
    ) -> Result<CommentReport> {
        self.mutate(|board| board.reports.review(id, status, moderator, notes))
    }

    pub fn delete_report(&self, id: &ReportId) -> Result<CommentReport> {
        self.mutate(|board| board.reports.delete(id))
    }

    /// Reports on a comment, newest first
    pub fn reports_for(&self, id: &CommentId) -> Result<Vec<CommentReport>> {
        self.read(|board| board.reports_for(id).into_iter().cloned().collect())
    }

    pub fn report_groups(&self, query: &GroupQuery) -> Result<Vec<CommentReportGroup>> {
        self.read(|board| board.reports.groups(query).into_iter().cloned().collect())
    }

    pub fn group_stats(&self) -> Result<GroupStats> {
        self.read(|board| board.reports.stats(self.moderation.high_priority_threshold))
    }

    /// Recompute every report group. Returns the number of groups.
    pub fn rebuild_report_groups(&self) -> Result<usize> {
        self.mutate(|board| Ok(board.reports.rebuild_groups()))
    }

    // ---- moderation ----

    /// Apply a decision without checking the moderator's rights
    pub fn apply_decision(&self, mut action: ModerationAction) -> Result<AppliedDecision> {
        if action.decision == ModerationDecision::Edit {
            if let Some(content) = action.new_content.as_deref() {
                self.validator.validate_content(content)?;
            }
        }
        let applied = self.mutate(|board| {
            if action.project.is_none() {
                let comment = board.comments.require(&action.comment)?;
                action.project = self.project_of(board, comment);
            }
            DecisionEngine::new(&self.moderation).apply(board, action)
        })?;
        self.dispatch(applied.notifications.clone());
        Ok(applied)
    }

    /// Apply a decision on behalf of `actor`, who must moderate the
    /// comment's project and hold a level that permits the decision
    pub fn moderate(&self, actor: &Actor, action: ModerationAction) -> Result<AppliedDecision> {
        if action.moderator != actor.id {
            return Err(ModlogError::PermissionDenied(format!(
                "{} cannot act as moderator {}",
                actor.id, action.moderator
            )));
        }
        if !self.can_moderate(actor, &action.comment)? {
            return Err(ModlogError::PermissionDenied(format!(
                "{} cannot moderate comment {}",
                actor.id, action.comment
            )));
        }
        let level = self.moderator_level(actor);
        if !action.decision.allowed_for(level) {
            return Err(ModlogError::PermissionDenied(format!(
                "{} may not issue {}",
                level,
                action.decision.as_str()
            )));
        }
        self.apply_decision(action)
    }

    /// Level of an actor allowed to moderate; unknown levels count as senior
    pub fn moderator_level(&self, actor: &Actor) -> ModeratorLevel {
        self.permissions
            .moderator_level(actor)
            .unwrap_or(ModeratorLevel::Senior)
    }

    /// Thread deletion outside a moderation action
    pub fn soft_delete_thread(
        &self,
        id: &CommentId,
        moderator: &UserId,
        reason: Option<&str>,
    ) -> Result<ThreadDeletionReport> {
        self.mutate(|board| {
            let project = self.project_of(board, board.comments.require(id)?);
            board.soft_delete_thread(id, moderator, reason, None, project)
        })
    }

    /// Moderation actions on a comment, newest first
    pub fn actions_for(&self, id: &CommentId) -> Result<Vec<ModerationAction>> {
        self.read(|board| board.actions_for(id).into_iter().cloned().collect())
    }

    // ---- history ----

    pub fn change_history(&self, id: &CommentId, include_user_edits: bool) -> Result<Vec<ChangeLogEntry>> {
        self.read(|board| {
            board.comments.require(id)?;
            Ok(board
                .changelog
                .history(id, include_user_edits)
                .into_iter()
                .cloned()
                .collect())
        })?
    }

    /// History as `actor` may see it: platform staff see everything,
    /// project moderators the moderation-only view
    pub fn history_for(&self, actor: &Actor, id: &CommentId) -> Result<Vec<ChangeLogEntry>> {
        if !self.can_view_history(actor, id)? {
            return Err(ModlogError::PermissionDenied(format!(
                "{} cannot view the history of comment {}",
                actor.id, id
            )));
        }
        self.change_history(id, permission::can_view_all_changes(actor))
    }

    /// Newest entries per the configured summary size, plus the total
    pub fn history_summary(&self, id: &CommentId) -> Result<(Vec<ChangeLogEntry>, usize)> {
        self.read(|board| {
            let HistorySummary { entries, total } =
                board.changelog.summary(id, self.moderation.summary_entries);
            (entries.into_iter().cloned().collect(), total)
        })
    }

    pub fn original_content(&self, id: &CommentId) -> Result<String> {
        self.read(|board| {
            let comment = board.comments.require(id)?;
            Ok(board.changelog.original_content(comment))
        })?
    }

    // ---- permission gates ----

    pub fn project_for(&self, id: &CommentId) -> Result<Option<ProjectId>> {
        self.read(|board| {
            let comment = board.comments.require(id)?;
            Ok(self.project_of(board, comment))
        })?
    }

    pub fn can_moderate(&self, actor: &Actor, id: &CommentId) -> Result<bool> {
        let project = self.project_for(id)?;
        Ok(permission::can_moderate(
            actor,
            project.as_ref(),
            self.permissions.as_ref(),
        ))
    }

    pub fn can_edit(&self, actor: &Actor, id: &CommentId) -> Result<bool> {
        self.read(|board| {
            let comment = board.comments.require(id)?;
            let project = self.project_of(board, comment);
            Ok(permission::can_edit(
                actor,
                comment,
                project.as_ref(),
                self.permissions.as_ref(),
            ))
        })?
    }

    pub fn can_view_history(&self, actor: &Actor, id: &CommentId) -> Result<bool> {
        let project = self.project_for(id)?;
        Ok(permission::can_view_history(
            actor,
            project.as_ref(),
            self.permissions.as_ref(),
        ))
    }

    /// Aggregates that disagree with a recount
    pub fn invariant_violations(&self) -> Result<Vec<String>> {
        self.read(|board| board.invariant_violations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangeType;
    use crate::moderation::DecisionScope;
    use crate::notify::recording::RecordingNotifier;
    use crate::report::ReportType;
    use crate::store::memory::MemoryStorage;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    struct Harness {
        service: CommentService,
        storage: Arc<MemoryStorage>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness_with(config: Config, notifier: RecordingNotifier) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let notifier = Arc::new(notifier);
        let mut permissions = StaticPermissions::from_config(&config.permissions);
        permissions.grant_project(ProjectId::from_string("p1"), UserId::from_string("mod"));
        permissions.grant_project(ProjectId::from_string("p1"), UserId::from_string("junior"));
        permissions.set_junior(UserId::from_string("junior"));

        let service = CommentService::open(storage.clone(), &config)
            .unwrap()
            .with_permissions(Arc::new(permissions))
            .with_parents(Arc::new(
                StaticParentResolver::new().with_task("t1", "p1"),
            ))
            .with_notifier(notifier.clone());
        Harness {
            service,
            storage,
            notifier,
        }
    }

    fn harness() -> Harness {
        harness_with(Config::default(), RecordingNotifier::new())
    }

    fn post(h: &Harness, author: &str, content: &str) -> Comment {
        h.service
            .create_comment(
                NewComment::new(Author::user(author), content)
                    .attach(ParentRef::parse("project:p1").unwrap()),
            )
            .unwrap()
    }

    fn reply(h: &Harness, parent: &Comment, author: &str) -> Comment {
        h.service
            .create_comment(NewComment::new(Author::user(author), "reply").reply_to(parent.id))
            .unwrap()
    }

    fn report(h: &Harness, comment: &Comment, reporter: &str, report_type: ReportType) -> CommentReport {
        h.service
            .file_report(
                &comment.id,
                NewReport {
                    reporter: Some(UserId::from_string(reporter)),
                    report_type,
                    description: None,
                },
            )
            .unwrap()
    }

    fn moderator() -> UserId {
        UserId::from_string("mod")
    }

    #[test]
    fn test_create_persists_and_counts_replies() {
        let h = harness();
        let root = post(&h, "alice", "Hello");
        let child = reply(&h, &root, "bob");

        assert_eq!(child.parent_ref, root.parent_ref);
        assert_eq!(h.service.comment(&root.id).unwrap().total_replies, 1);
        assert_eq!(h.storage.save_count(), 2);
        assert_eq!(h.storage.stored().unwrap().comments.count(), 2);
    }

    #[test]
    fn test_create_requires_attachment_and_content() {
        let h = harness();
        let detached = h
            .service
            .create_comment(NewComment::new(Author::user("alice"), "Floating"));
        assert!(matches!(detached, Err(ModlogError::InvalidArgument(_))));

        let empty = h.service.create_comment(
            NewComment::new(Author::user("alice"), "  ")
                .attach(ParentRef::parse("project:p1").unwrap()),
        );
        assert!(empty.unwrap_err().is_client_error());
        assert_eq!(h.storage.save_count(), 0);
    }

    #[test]
    fn test_pre_moderation_holds_comments() {
        let mut config = Config::default();
        config.moderation.pre_moderation = true;
        let h = harness_with(config, RecordingNotifier::new());

        let root = post(&h, "alice", "Held");
        assert_eq!(root.status, CommentStatus::Pending);
        reply(&h, &root, "bob");
        assert_eq!(h.service.comment(&root.id).unwrap().total_replies, 0);
    }

    #[test]
    fn test_reply_notifies_parent_author() {
        let h = harness();
        let root = post(&h, "alice", "Hello");
        reply(&h, &root, "bob");
        reply(&h, &root, "alice");

        let sent = h.notifier.sent_to("alice");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Reply);
        assert_eq!(sent[0].message, "bob replied to your comment");
    }

    #[test]
    fn test_vote_switch_keeps_one_vote() {
        let h = harness();
        let root = post(&h, "alice", "Vote on me");
        let voter = UserId::from_string("u");

        h.service.cast_vote(&root.id, &voter, VoteType::Upvote).unwrap();
        let after = h
            .service
            .cast_vote(&root.id, &voter, VoteType::Downvote)
            .unwrap();

        assert_eq!(after.score, -1);
        assert_eq!(
            h.service.user_vote(&root.id, &voter).unwrap().unwrap().vote_type,
            VoteType::Downvote
        );
        assert_eq!(h.service.read(|b| b.votes.count()).unwrap(), 1);
        assert_eq!(h.service.remove_vote(&root.id, &voter).unwrap().score, 0);
        assert!(h
            .service
            .remove_vote(&root.id, &voter)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_report_summary_scenario() {
        let h = harness();
        let root = post(&h, "alice", "Questionable");
        report(&h, &root, "r1", ReportType::Spam);
        report(&h, &root, "r2", ReportType::Spam);
        let filed = report(&h, &root, "r3", ReportType::Harassment);

        assert_eq!(filed.project, Some(ProjectId::from_string("p1")));
        assert_eq!(filed.reported_user, Some(UserId::from_string("alice")));
        let groups = h.service.report_groups(&GroupQuery::default()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_reports, 3);
        assert_eq!(
            groups[0].report_types_summary,
            BTreeMap::from([(ReportType::Spam, 2), (ReportType::Harassment, 1)])
        );
        assert_eq!(
            h.service.group_stats().unwrap(),
            GroupStats {
                total_groups: 1,
                pending_groups: 1,
                high_priority: 1,
            }
        );
    }

    #[test]
    fn test_review_and_delete_report_update_group() {
        let h = harness();
        let root = post(&h, "alice", "Questionable");
        let filed = report(&h, &root, "r1", ReportType::Spam);

        h.service
            .review_report(&filed.id, ReportStatus::Reviewed, &moderator(), Some("looking"))
            .unwrap();
        let groups = h.service.report_groups(&GroupQuery::default()).unwrap();
        assert_eq!(groups[0].status, ReportStatus::Reviewed);

        h.service.delete_report(&filed.id).unwrap();
        assert!(h
            .service
            .report_groups(&GroupQuery::default())
            .unwrap()
            .is_empty());
        assert!(h.service.invariant_violations().unwrap().is_empty());
    }

    #[test]
    fn test_remove_content_scenario() {
        let h = harness();
        let root = post(&h, "alice", "Spammy content");
        for reporter in ["r1", "r2", "r3"] {
            report(&h, &root, reporter, ReportType::Spam);
        }

        let action = ModerationAction::builder(root.id, moderator(), ModerationDecision::RemoveContentOnly)
            .scope(DecisionScope::AllReports)
            .notify_reporters(true)
            .build()
            .unwrap();
        let applied = h.service.apply_decision(action).unwrap();

        let comment = h.service.comment(&root.id).unwrap();
        assert_eq!(comment.content, crate::config::REMOVED_CONTENT_PLACEHOLDER);
        assert_eq!(comment.status, CommentStatus::ContentRemoved);
        for report in h.service.reports_for(&root.id).unwrap() {
            assert_eq!(report.status, ReportStatus::Resolved);
            assert_eq!(report.reviewed_by, Some(moderator()));
        }
        let history = h.service.change_history(&root.id, true).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].change_type, ChangeType::ContentRemoval);
        assert_eq!(history[0].project, Some(ProjectId::from_string("p1")));

        assert_eq!(applied.resolved_reports.len(), 3);
        assert_eq!(h.notifier.sent_to("r1").len(), 1);
        assert_eq!(h.notifier.sent_to("alice").len(), 1);
        let actions = h.service.actions_for(&root.id).unwrap();
        assert_eq!(actions[0].previous_content.as_deref(), Some("Spammy content"));
        assert!(h.service.invariant_violations().unwrap().is_empty());
    }

    #[test]
    fn test_thread_deletion_scenario() {
        let h = harness();
        let grandparent = post(&h, "zed", "Top");
        let r = reply(&h, &grandparent, "alice");
        let a = reply(&h, &r, "bob");
        let b = reply(&h, &r, "carol");
        let a1 = reply(&h, &a, "dave");
        assert_eq!(h.service.comment(&grandparent.id).unwrap().total_replies, 1);

        let deletion = h
            .service
            .soft_delete_thread(&r.id, &moderator(), Some("derailed"))
            .unwrap();

        assert_eq!(
            h.service.comment(&r.id).unwrap().status,
            CommentStatus::ThreadDeleted
        );
        for id in [a.id, b.id, a1.id] {
            assert_eq!(
                h.service.comment(&id).unwrap().status,
                CommentStatus::ReplyToDeleted
            );
        }
        assert_eq!(h.service.comment(&grandparent.id).unwrap().total_replies, 0);

        let root_entries = h.service.change_history(&r.id, true).unwrap();
        assert_eq!(root_entries.len(), 1);
        assert_eq!(root_entries[0].affected_children_count, 3);
        let bulk = deletion.bulk_operation.unwrap();
        let shared = h
            .service
            .read(|board| board.changelog.entries_for_bulk_operation(&bulk).len())
            .unwrap();
        assert_eq!(shared, 4);
        assert!(h.service.invariant_violations().unwrap().is_empty());
    }

    #[test]
    fn test_original_content_round_trip() {
        let h = harness();
        let root = post(&h, "alice", "Original words");
        let alice = UserId::from_string("alice");

        h.service.edit_comment(&root.id, Some(&alice), "Second").unwrap();
        let edited = h.service.edit_comment(&root.id, Some(&alice), "Third").unwrap();

        assert!(edited.is_edited);
        assert_eq!(edited.edit_history.len(), 2);
        assert_eq!(h.service.original_content(&root.id).unwrap(), "Original words");
    }

    #[test]
    fn test_moderate_checks_rights_and_level() {
        let h = harness();
        let root = post(&h, "alice", "Text");

        let outsider = Actor::user("eve");
        let action = ModerationAction::builder(root.id, outsider.id.clone(), ModerationDecision::Reject)
            .build()
            .unwrap();
        assert!(matches!(
            h.service.moderate(&outsider, action),
            Err(ModlogError::PermissionDenied(_))
        ));

        let junior = Actor::user("junior");
        let ban = ModerationAction::builder(root.id, junior.id.clone(), ModerationDecision::BanUser)
            .build()
            .unwrap();
        assert!(matches!(
            h.service.moderate(&junior, ban),
            Err(ModlogError::PermissionDenied(_))
        ));
        let warn = ModerationAction::builder(root.id, junior.id.clone(), ModerationDecision::WarnUser)
            .build()
            .unwrap();
        assert!(h.service.moderate(&junior, warn).is_ok());

        let impersonation = ModerationAction::builder(root.id, moderator(), ModerationDecision::Reject)
            .build()
            .unwrap();
        assert!(h.service.moderate(&junior, impersonation).is_err());

        let staff = Actor::staff("ops");
        let ban = ModerationAction::builder(root.id, staff.id.clone(), ModerationDecision::BanUser)
            .build()
            .unwrap();
        assert!(h.service.moderate(&staff, ban).is_ok());
    }

    #[test]
    fn test_conflicting_decisions() {
        let h = harness();
        let root = post(&h, "alice", "Text");
        let seen = root.version;

        let first = ModerationAction::builder(root.id, moderator(), ModerationDecision::Approve)
            .expected_version(seen)
            .build()
            .unwrap();
        let second = ModerationAction::builder(root.id, moderator(), ModerationDecision::Reject)
            .expected_version(seen)
            .build()
            .unwrap();

        h.service.apply_decision(first).unwrap();
        let err = h.service.apply_decision(second).unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(
            h.service.comment(&root.id).unwrap().status,
            CommentStatus::Approved
        );
    }

    #[test]
    fn test_votes_do_not_cause_conflicts() {
        let h = harness();
        let root = post(&h, "alice", "Text");
        h.service
            .cast_vote(&root.id, &UserId::from_string("u"), VoteType::Upvote)
            .unwrap();

        let action = ModerationAction::builder(root.id, moderator(), ModerationDecision::Flag)
            .expected_version(root.version)
            .build()
            .unwrap();
        assert!(h.service.apply_decision(action).is_ok());
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let h = harness();
        let root = post(&h, "alice", "Text");
        h.storage.fail_saves(true);

        let action = ModerationAction::builder(root.id, moderator(), ModerationDecision::Reject)
            .build()
            .unwrap();
        assert!(h.service.apply_decision(action).is_err());

        h.storage.fail_saves(false);
        assert_eq!(
            h.service.comment(&root.id).unwrap().status,
            CommentStatus::Approved
        );
        assert!(h.service.change_history(&root.id, true).unwrap().is_empty());
        assert!(h.notifier.sent().is_empty());
    }

    #[test]
    fn test_notification_failure_does_not_roll_back() {
        let h = harness_with(Config::default(), RecordingNotifier::failing());
        let root = post(&h, "alice", "Text");

        let action = ModerationAction::builder(root.id, moderator(), ModerationDecision::Reject)
            .build()
            .unwrap();
        h.service.apply_decision(action).unwrap();

        assert_eq!(
            h.service.comment(&root.id).unwrap().status,
            CommentStatus::Rejected
        );
    }

    #[test]
    fn test_history_visibility() {
        let h = harness();
        let root = post(&h, "alice", "Text");
        h.service
            .edit_comment(&root.id, Some(&UserId::from_string("alice")), "Edited")
            .unwrap();
        h.service
            .apply_decision(
                ModerationAction::builder(root.id, moderator(), ModerationDecision::Flag)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(h.service.history_for(&Actor::staff("ops"), &root.id).unwrap().len(), 2);
        assert_eq!(h.service.history_for(&Actor::user("mod"), &root.id).unwrap().len(), 1);
        assert!(h.service.history_for(&Actor::user("eve"), &root.id).is_err());
        assert_eq!(h.service.history_summary(&root.id).unwrap().1, 2);
    }

    #[test]
    fn test_permission_gates() {
        let h = harness();
        let on_task = h
            .service
            .create_comment(
                NewComment::new(Author::user("alice"), "On a task")
                    .attach(ParentRef::parse("task:t1").unwrap()),
            )
            .unwrap();

        assert!(h.service.can_moderate(&Actor::user("mod"), &on_task.id).unwrap());
        assert!(!h.service.can_moderate(&Actor::user("eve"), &on_task.id).unwrap());
        assert!(h.service.can_edit(&Actor::user("alice"), &on_task.id).unwrap());
        assert!(!h.service.can_edit(&Actor::user("eve"), &on_task.id).unwrap());
        assert!(h.service.can_moderate(&Actor::superuser("root"), &on_task.id).unwrap());
    }

    #[test]
    fn test_remove_comment_and_rebuild() {
        let h = harness();
        let root = post(&h, "alice", "Text");
        let child = reply(&h, &root, "bob");
        report(&h, &child, "r1", ReportType::Spam);

        let removal = h.service.remove_comment(&child.id).unwrap();
        assert_eq!(removal.reports, 1);
        assert_eq!(h.service.comment(&root.id).unwrap().total_replies, 0);
        assert!(h.service.comment(&child.id).unwrap_err().is_not_found());
        assert_eq!(h.service.rebuild_report_groups().unwrap(), 0);
    }

    #[test]
    fn test_reopen_from_storage() {
        let h = harness();
        let root = post(&h, "alice", "Persisted");
        reply(&h, &root, "bob");

        let reopened = CommentService::open(h.storage.clone(), &Config::default()).unwrap();
        assert_eq!(reopened.replies(&root.id).unwrap().len(), 1);
        assert!(reopened.invariant_violations().unwrap().is_empty());
    }

    #[test]
    fn test_services_sharing_storage_keep_each_others_writes() {
        let h = harness();
        let root = post(&h, "alice", "Shared");
        let other = CommentService::open(h.storage.clone(), &Config::default()).unwrap();

        h.service
            .cast_vote(&root.id, &UserId::from_string("u1"), VoteType::Upvote)
            .unwrap();
        other
            .cast_vote(&root.id, &UserId::from_string("u2"), VoteType::Upvote)
            .unwrap();

        let reject = ModerationAction::builder(root.id, moderator(), ModerationDecision::Reject)
            .build()
            .unwrap();
        h.service.apply_decision(reject).unwrap();
        let flag = ModerationAction::builder(root.id, moderator(), ModerationDecision::Flag)
            .build()
            .unwrap();
        other.apply_decision(flag).unwrap();

        let reopened = CommentService::open(h.storage.clone(), &Config::default()).unwrap();
        let stored = reopened.comment(&root.id).unwrap();
        assert_eq!(stored.score, 2);
        assert_eq!(stored.status, CommentStatus::Flagged);
        reopened
            .read(|board| assert_eq!(board.votes.count(), 2))
            .unwrap();
        let types: Vec<_> = reopened
            .change_history(&root.id, true)
            .unwrap()
            .into_iter()
            .map(|e| e.change_type)
            .collect();
        assert_eq!(types, vec![ChangeType::Flagged, ChangeType::Rejection]);
    }

    #[test]
    fn test_moderator_edit_content_is_validated() {
        let mut config = Config::default();
        config.validation.max_comment_length = 10;
        let h = harness_with(config, RecordingNotifier::new());
        let root = post(&h, "alice", "Short");

        let action = ModerationAction::builder(root.id, moderator(), ModerationDecision::Edit)
            .new_content("Far too long for this board")
            .build()
            .unwrap();
        let err = h.service.apply_decision(action).unwrap_err();

        assert!(matches!(err, ModlogError::InvalidArgument(_)));
        assert_eq!(h.service.comment(&root.id).unwrap().content, "Short");
        assert!(h.service.change_history(&root.id, true).unwrap().is_empty());
    }
}
