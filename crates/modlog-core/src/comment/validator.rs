//! Comment validation

use super::model::{Author, Comment};
use crate::config::ValidationConfig;
use crate::error::{ModlogError, Result};

/// Maximum comment length (default)
pub const MAX_COMMENT_LENGTH: usize = 10000;

/// Minimum comment length
pub const MIN_COMMENT_LENGTH: usize = 1;

/// Validator for comments
#[derive(Debug, Clone)]
pub struct CommentValidator {
    max_length: usize,
    min_length: usize,
}

impl CommentValidator {
    /// Create a new validator with default settings
    pub fn new() -> Self {
        Self {
            max_length: MAX_COMMENT_LENGTH,
            min_length: MIN_COMMENT_LENGTH,
        }
    }

    /// Create a new validator with custom max length
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            min_length: MIN_COMMENT_LENGTH,
        }
    }

    /// Create from the `[validation]` config section
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            max_length: config.max_comment_length,
            min_length: config.min_comment_length.max(MIN_COMMENT_LENGTH),
        }
    }

    /// Validate comment content
    pub fn validate_content(&self, content: &str) -> Result<()> {
        let length = content.trim().chars().count();

        if length < self.min_length {
            return Err(ModlogError::InvalidArgument(
                "Comment content cannot be empty".to_string(),
            ));
        }

        if length > self.max_length {
            return Err(ModlogError::InvalidArgument(format!(
                "Comment content exceeds maximum length of {} characters",
                self.max_length
            )));
        }

        Ok(())
    }

    /// Validate a complete comment
    pub fn validate(&self, comment: &Comment) -> Result<()> {
        self.validate_content(&comment.content)?;

        if let Author::Anonymous {
            email: Some(email), ..
        } = &comment.author
        {
            let email = email.trim();
            if !email.is_empty() && !email.contains('@') {
                return Err(ModlogError::InvalidArgument(format!(
                    "Invalid author email: {}",
                    email
                )));
            }
        }

        Ok(())
    }
}

impl Default for CommentValidator {
    fn default() -> Self {
        Self::new()
    }
}
