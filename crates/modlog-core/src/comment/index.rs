//! Comment indexing for fast lookup

use super::model::{Comment, ParentRef};
use crate::types::CommentId;
use std::collections::HashMap;

/// Multi-dimensional index for comments
#[derive(Debug, Clone, Default)]
pub struct CommentIndex {
    /// Direct replies by parent comment (adjacency for thread walks)
    by_parent: HashMap<CommentId, Vec<CommentId>>,
    /// Top-level comments by attached entity
    by_ref: HashMap<ParentRef, Vec<CommentId>>,
}

impl CommentIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a comment to the index
    pub fn add(&mut self, comment: &Comment) {
        match comment.parent {
            Some(parent) => self.by_parent.entry(parent).or_default().push(comment.id),
            None => self
                .by_ref
                .entry(comment.parent_ref.clone())
                .or_default()
                .push(comment.id),
        }
    }

    /// Remove a comment from the index
    pub fn remove(&mut self, comment: &Comment) {
        match comment.parent {
            Some(parent) => remove_from(&mut self.by_parent, &parent, &comment.id),
            None => remove_from(&mut self.by_ref, &comment.parent_ref, &comment.id),
        }

        // Orphaned reply lists are dropped with the parent
        self.by_parent.remove(&comment.id);
    }

    /// Direct replies of a comment, in insertion order
    pub fn children(&self, parent: &CommentId) -> &[CommentId] {
        self.by_parent.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Top-level comments attached to an entity
    pub fn top_level(&self, parent_ref: &ParentRef) -> &[CommentId] {
        self.by_ref.get(parent_ref).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn remove_from<K: std::hash::Hash + Eq>(
    map: &mut HashMap<K, Vec<CommentId>>,
    key: &K,
    id: &CommentId,
) {
    if let Some(ids) = map.get_mut(key) {
        ids.retain(|existing| existing != id);
        if ids.is_empty() {
            map.remove(key);
        }
    }
}
