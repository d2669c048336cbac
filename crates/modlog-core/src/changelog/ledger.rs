//! Append-only change ledger

use super::model::{ChangeLogEntry, ChangeRecord, ChangeType};
use crate::comment::Comment;
use crate::error::{ModlogError, Result};
use crate::types::{BulkOperationId, ChangeId, CommentId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Newest entries of a comment's history plus the overall count
#[derive(Debug, Clone)]
pub struct HistorySummary<'a> {
    pub entries: Vec<&'a ChangeLogEntry>,
    pub total: usize,
}

impl HistorySummary<'_> {
    /// More entries exist than were returned
    pub fn has_more(&self) -> bool {
        self.total > self.entries.len()
    }
}

/// Ledger of every state-affecting change. Entries are never updated or removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeLog {
    entries: Vec<ChangeLogEntry>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry for `comment`
    pub fn log_change(&mut self, comment: CommentId, record: ChangeRecord) -> Result<ChangeId> {
        if record.change_type == ChangeType::BulkThreadDeletion
            && record.bulk_operation_id.is_none()
        {
            return Err(ModlogError::InvalidArgument(
                "A bulk thread deletion needs a bulk operation id".to_string(),
            ));
        }

        let sequence = self.entries.last().map_or(1, |e| e.sequence + 1);
        let entry = ChangeLogEntry {
            id: ChangeId::new(),
            comment,
            change_type: record.change_type,
            changed_by: record.changed_by,
            previous_content: record.previous_content,
            new_content: record.new_content,
            previous_status: record.previous_status,
            new_status: record.new_status,
            reason: record.reason,
            moderation_action: record.moderation_action,
            affected_children_count: record.affected_children_count,
            bulk_operation_id: record.bulk_operation_id,
            project: record.project,
            created_at: Utc::now(),
            sequence,
        };
        debug!("Logged {} on comment {}", entry.change_type, comment);
        let id = entry.id;
        self.entries.push(entry);
        Ok(id)
    }

    pub fn get(&self, id: &ChangeId) -> Option<&ChangeLogEntry> {
        self.entries.iter().find(|e| e.id == *id)
    }

    fn for_comment(
        &self,
        comment: &CommentId,
    ) -> impl DoubleEndedIterator<Item = &ChangeLogEntry> + '_ {
        let comment = *comment;
        self.entries.iter().filter(move |e| e.comment == comment)
    }

    /// History of a comment, newest first. Without user edits this is the
    /// moderation-only view.
    pub fn history(&self, comment: &CommentId, include_user_edits: bool) -> Vec<&ChangeLogEntry> {
        self.for_comment(comment)
            .rev()
            .filter(|e| include_user_edits || e.change_type.is_moderation())
            .collect()
    }

    /// Content before the first logged content change, else the current content
    pub fn original_content(&self, comment: &Comment) -> String {
        self.for_comment(&comment.id)
            .find_map(|e| e.previous_content.clone())
            .unwrap_or_else(|| comment.content.clone())
    }

    pub fn has_moderation_history(&self, comment: &CommentId) -> bool {
        self.for_comment(comment)
            .any(|e| e.change_type.is_moderation())
    }

    pub fn change_count(&self, comment: &CommentId) -> usize {
        self.for_comment(comment).count()
    }

    pub fn moderation_change_count(&self, comment: &CommentId) -> usize {
        self.for_comment(comment)
            .filter(|e| e.change_type.is_moderation())
            .count()
    }

    /// The newest `max_entries` entries and the total count
    pub fn summary(&self, comment: &CommentId, max_entries: usize) -> HistorySummary<'_> {
        let history = self.history(comment, true);
        let total = history.len();
        HistorySummary {
            entries: history.into_iter().take(max_entries).collect(),
            total,
        }
    }

    /// Every entry written by one fan-out operation, in append order
    pub fn entries_for_bulk_operation(&self, id: &BulkOperationId) -> Vec<&ChangeLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.bulk_operation_id.as_ref() == Some(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
