//! Comment votes and score aggregation

use crate::error::{ModlogError, Result};
use crate::types::{CommentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Direction of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Upvote => "UPVOTE",
            VoteType::Downvote => "DOWNVOTE",
        }
    }
}

impl std::fmt::Display for VoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteType::Upvote => write!(f, "Upvote"),
            VoteType::Downvote => write!(f, "Downvote"),
        }
    }
}

impl FromStr for VoteType {
    type Err = ModlogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upvote" | "up" => Ok(VoteType::Upvote),
            "downvote" | "down" => Ok(VoteType::Downvote),
            _ => Err(ModlogError::InvalidArgument(format!("Unknown vote type: {}", s))),
        }
    }
}

/// One user's vote on one comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentVote {
    pub comment: CommentId,
    pub user: UserId,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upvote and downvote totals for a comment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub upvotes: usize,
    pub downvotes: usize,
}

impl VoteTally {
    pub fn score(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }
}

/// All votes, unique per (comment, user)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteLedger {
    votes: HashMap<CommentId, HashMap<UserId, CommentVote>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite the user's vote. Returns the previous vote type.
    pub fn cast(&mut self, comment: CommentId, user: &UserId, vote_type: VoteType) -> Option<VoteType> {
        let now = Utc::now();
        let votes = self.votes.entry(comment).or_default();

        match votes.get_mut(user) {
            Some(existing) => {
                let previous = existing.vote_type;
                existing.vote_type = vote_type;
                existing.updated_at = now;
                Some(previous)
            }
            None => {
                votes.insert(
                    user.clone(),
                    CommentVote {
                        comment,
                        user: user.clone(),
                        vote_type,
                        created_at: now,
                        updated_at: now,
                    },
                );
                None
            }
        }
    }

    /// Delete the user's vote, failing with `VoteNotFound` if there is none
    pub fn remove(&mut self, comment: CommentId, user: &UserId) -> Result<CommentVote> {
        let removed = self
            .votes
            .get_mut(&comment)
            .and_then(|votes| votes.remove(user))
            .ok_or_else(|| ModlogError::VoteNotFound {
                comment: comment.to_string(),
                user: user.to_string(),
            })?;

        if self.votes.get(&comment).is_some_and(|votes| votes.is_empty()) {
            self.votes.remove(&comment);
        }
        Ok(removed)
    }

    /// Full recount of a comment's votes
    pub fn tally(&self, comment: &CommentId) -> VoteTally {
        let mut tally = VoteTally::default();
        if let Some(votes) = self.votes.get(comment) {
            for vote in votes.values() {
                match vote.vote_type {
                    VoteType::Upvote => tally.upvotes += 1,
                    VoteType::Downvote => tally.downvotes += 1,
                }
            }
        }
        tally
    }

    /// Upvotes minus downvotes
    pub fn score(&self, comment: &CommentId) -> i64 {
        self.tally(comment).score()
    }

    pub fn user_vote(&self, comment: &CommentId, user: &UserId) -> Option<&CommentVote> {
        self.votes.get(comment).and_then(|votes| votes.get(user))
    }

    /// Drop every vote on a comment. Returns how many were removed.
    pub fn remove_comment(&mut self, comment: &CommentId) -> usize {
        self.votes.remove(comment).map(|votes| votes.len()).unwrap_or(0)
    }

    /// Total votes across all comments
    pub fn count(&self) -> usize {
        self.votes.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_and_score() {
        let mut ledger = VoteLedger::new();
        let comment = CommentId::new();

        ledger.cast(comment, &UserId::from_string("a"), VoteType::Upvote);
        ledger.cast(comment, &UserId::from_string("b"), VoteType::Upvote);
        ledger.cast(comment, &UserId::from_string("c"), VoteType::Downvote);

        assert_eq!(
            ledger.tally(&comment),
            VoteTally {
                upvotes: 2,
                downvotes: 1
            }
        );
        assert_eq!(ledger.score(&comment), 1);
    }

    #[test]
    fn test_switching_vote_overwrites() {
        let mut ledger = VoteLedger::new();
        let comment = CommentId::new();
        let user = UserId::from_string("u");

        assert_eq!(ledger.cast(comment, &user, VoteType::Upvote), None);
        assert_eq!(
            ledger.cast(comment, &user, VoteType::Downvote),
            Some(VoteType::Upvote)
        );

        assert_eq!(ledger.count(), 1);
        assert_eq!(ledger.score(&comment), -1);
        assert_eq!(
            ledger.user_vote(&comment, &user).map(|v| v.vote_type),
            Some(VoteType::Downvote)
        );
    }

    #[test]
    fn test_remove_missing_vote() {
        let mut ledger = VoteLedger::new();
        let err = ledger
            .remove(CommentId::new(), &UserId::from_string("u"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_remove_vote() {
        let mut ledger = VoteLedger::new();
        let comment = CommentId::new();
        let user = UserId::from_string("u");
        ledger.cast(comment, &user, VoteType::Upvote);

        let removed = ledger.remove(comment, &user).unwrap();

        assert_eq!(removed.vote_type, VoteType::Upvote);
        assert_eq!(ledger.score(&comment), 0);
        assert!(ledger.user_vote(&comment, &user).is_none());
    }

    #[test]
    fn test_remove_comment_votes() {
        let mut ledger = VoteLedger::new();
        let comment = CommentId::new();
        ledger.cast(comment, &UserId::from_string("a"), VoteType::Upvote);
        ledger.cast(comment, &UserId::from_string("b"), VoteType::Downvote);

        assert_eq!(ledger.remove_comment(&comment), 2);
        assert_eq!(ledger.count(), 0);
    }

    #[test]
    fn test_vote_type_parsing() {
        assert_eq!("UPVOTE".parse::<VoteType>().unwrap(), VoteType::Upvote);
        assert_eq!("down".parse::<VoteType>().unwrap(), VoteType::Downvote);
        assert!(matches!(
            "sideways".parse::<VoteType>(),
            Err(ModlogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_ledger_serialization() {
        let mut ledger = VoteLedger::new();
        let comment = CommentId::new();
        ledger.cast(comment, &UserId::from_string("a"), VoteType::Upvote);

        let json = serde_json::to_string(&ledger).unwrap();
        let restored: VoteLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.score(&comment), 1);
    }
}
