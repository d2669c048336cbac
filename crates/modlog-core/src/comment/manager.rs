//! Comment store with thread-aware maintenance
//!
//! Reply counts and thread deletion walk the reply tree through the
//! [`CommentIndex`] adjacency lists with explicit stacks, so depth is bounded
//! only by memory.

use super::index::CommentIndex;
use super::model::{Comment, CommentStatus, ParentRef};
use crate::error::{ModlogError, Result};
use crate::types::{CommentId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Manager for comments with indexing support
#[derive(Debug, Clone, Serialize)]
pub struct CommentManager {
    /// All comments by ID
    comments: HashMap<CommentId, Comment>,
    /// Adjacency and lookup index
    #[serde(skip)]
    index: CommentIndex,
}

/// A reply moved to REPLY_TO_DELETED by a thread deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadedReply {
    pub id: CommentId,
    pub previous_status: CommentStatus,
}

/// Result of [`CommentManager::soft_delete_thread`]
#[derive(Debug, Clone)]
pub struct ThreadDeletion {
    pub root: CommentId,
    pub root_previous_status: CommentStatus,
    /// Every descendant transitioned, in depth-first order
    pub cascaded: Vec<CascadedReply>,
}

impl CommentManager {
    /// Create a new empty comment manager
    pub fn new() -> Self {
        Self {
            comments: HashMap::new(),
            index: CommentIndex::new(),
        }
    }

    /// Add a comment. Refreshes the parent chain's reply counts for replies.
    pub fn add(&mut self, comment: Comment) -> Result<CommentId> {
        let id = comment.id;

        if self.comments.contains_key(&id) {
            return Err(ModlogError::InvalidArgument(format!(
                "Comment with ID {} already exists",
                id
            )));
        }

        if let Some(parent) = comment.parent {
            if !self.comments.contains_key(&parent) {
                return Err(ModlogError::CommentNotFound(parent.to_string()));
            }
        }

        let parent = comment.parent;
        self.index.add(&comment);
        self.comments.insert(id, comment);

        if let Some(parent) = parent {
            self.update_reply_count(parent);
        }
        Ok(id)
    }

    /// Get a comment by ID
    pub fn get(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.get(id)
    }

    /// Get a comment or fail with `CommentNotFound`
    pub fn require(&self, id: &CommentId) -> Result<&Comment> {
        self.comments
            .get(id)
            .ok_or_else(|| ModlogError::CommentNotFound(id.to_string()))
    }

    /// Mutable access, failing with `CommentNotFound`.
    ///
    /// Callers changing `status` must call [`Self::update_reply_count`] on
    /// the parent afterwards.
    pub fn require_mut(&mut self, id: &CommentId) -> Result<&mut Comment> {
        self.comments
            .get_mut(id)
            .ok_or_else(|| ModlogError::CommentNotFound(id.to_string()))
    }

    /// Direct replies, oldest first
    pub fn replies(&self, id: &CommentId) -> Vec<&Comment> {
        let mut replies: Vec<_> = self
            .index
            .children(id)
            .iter()
            .filter_map(|child| self.comments.get(child))
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        replies
    }

    /// Top-level comments attached to an entity, newest first
    pub fn top_level(&self, parent_ref: &ParentRef) -> Vec<&Comment> {
        let mut comments: Vec<_> = self
            .index
            .top_level(parent_ref)
            .iter()
            .filter_map(|id| self.comments.get(id))
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    /// Number of direct replies currently APPROVED
    pub fn approved_reply_count(&self, id: &CommentId) -> usize {
        self.index
            .children(id)
            .iter()
            .filter_map(|child| self.comments.get(child))
            .filter(|child| child.status.is_visible())
            .count()
    }

    /// Recompute `total_replies` from `start` up to the thread root
    pub fn update_reply_count(&mut self, start: CommentId) {
        let mut visited = HashSet::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let count = self.approved_reply_count(&id);
            current = match self.comments.get_mut(&id) {
                Some(comment) => {
                    comment.set_total_replies(count);
                    comment.parent
                }
                None => None,
            };
        }
        debug!("Refreshed reply counts from {} ({} nodes)", start, visited.len());
    }

    /// All descendants of a comment in depth-first pre-order
    pub fn descendants(&self, id: &CommentId) -> Vec<CommentId> {
        let mut out = Vec::new();
        let mut stack: Vec<CommentId> = self.index.children(id).iter().rev().copied().collect();
        let mut seen = HashSet::new();

        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.index.children(&next).iter().rev().copied());
        }
        out
    }

    /// Mark `root` THREAD_DELETED and every APPROVED reply beneath it
    /// REPLY_TO_DELETED. The walk covers the whole subtree; replies in any
    /// other status keep it but their own replies are still visited.
    /// Reply counts of the touched comments and of the root's ancestors
    /// are refreshed afterwards.
    pub fn soft_delete_thread(
        &mut self,
        root: CommentId,
        moderator: &UserId,
        reason: Option<&str>,
    ) -> Result<ThreadDeletion> {
        let root_comment = self.require_mut(&root)?;
        let root_previous_status = root_comment.status;
        root_comment.mark_thread_deleted(moderator, reason);

        let mut cascaded = Vec::new();
        let mut visited = Vec::new();
        let mut stack: Vec<CommentId> = self.index.children(&root).iter().rev().copied().collect();
        let mut seen = HashSet::from([root]);

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(reply) = self.comments.get_mut(&id) else {
                continue;
            };
            if reply.status == CommentStatus::Approved {
                reply.mark_reply_to_deleted(moderator, reason);
                cascaded.push(CascadedReply {
                    id,
                    previous_status: CommentStatus::Approved,
                });
            }
            visited.push(id);
            stack.extend(self.index.children(&id).iter().rev().copied());
        }

        for id in &visited {
            let count = self.approved_reply_count(id);
            if let Some(comment) = self.comments.get_mut(id) {
                comment.set_total_replies(count);
            }
        }
        self.update_reply_count(root);

        Ok(ThreadDeletion {
            root,
            root_previous_status,
            cascaded,
        })
    }

    /// Physically delete a comment and its whole reply subtree.
    /// Returns the removed comments, root first.
    pub fn remove(&mut self, id: &CommentId) -> Result<Vec<Comment>> {
        let parent = self.require(id)?.parent;

        let mut order = vec![*id];
        order.extend(self.descendants(id));

        // Leaves first so index entries are removed child-before-parent
        let mut removed = Vec::with_capacity(order.len());
        for target in order.iter().rev() {
            if let Some(comment) = self.comments.remove(target) {
                self.index.remove(&comment);
                removed.push(comment);
            }
        }
        removed.reverse();

        if let Some(parent) = parent {
            self.update_reply_count(parent);
        }
        Ok(removed)
    }

    /// Get all comments
    pub fn all(&self) -> Vec<&Comment> {
        self.comments.values().collect()
    }

    /// Get all comments sorted by creation time
    pub fn all_sorted(&self) -> Vec<&Comment> {
        let mut comments: Vec<_> = self.comments.values().collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        comments
    }

    /// Get total comment count
    pub fn count(&self) -> usize {
        self.comments.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Rebuild index (after deserialization)
    pub fn rebuild_index(&mut self) {
        self.index = CommentIndex::new();
        for comment in self.comments.values() {
            self.index.add(comment);
        }
    }
}

impl Default for CommentManager {
    fn default() -> Self {
        Self::new()
    }
}

// Custom deserialization to rebuild index
impl<'de> serde::de::Deserialize<'de> for CommentManager {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct CommentManagerHelper {
            comments: HashMap<CommentId, Comment>,
        }

        let helper = CommentManagerHelper::deserialize(deserializer)?;
        let mut manager = Self {
            comments: helper.comments,
            index: CommentIndex::new(),
        };
        manager.rebuild_index();
        Ok(manager)
    }
}
