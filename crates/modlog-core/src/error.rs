//! Error types for modlog

use thiserror::Error;

/// Main error type for modlog
#[derive(Debug, Error)]
pub enum ModlogError {
    /// Comment not found
    #[error("Comment not found: {0}")]
    CommentNotFound(String),

    /// Report not found
    #[error("Report not found: {0}")]
    ReportNotFound(String),

    /// No vote recorded for the (comment, user) pair
    #[error("No vote to remove on comment {comment} for user {user}")]
    VoteNotFound { comment: String, user: String },

    /// Moderation action not found
    #[error("Moderation action not found: {0}")]
    ActionNotFound(String),

    /// Unrecognized or malformed input value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Actor lacks the rights for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Comment changed since the caller read it
    #[error("Conflict on comment {comment}: expected version {expected}, found {actual}")]
    Conflict {
        comment: String,
        expected: u64,
        actual: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported schema version
    #[error("Unsupported schema version: {0}")]
    UnsupportedSchemaVersion(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ModlogError>,
    },
}

impl ModlogError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ModlogError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &ModlogError {
        match self {
            ModlogError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Lookup of a missing entity
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            ModlogError::CommentNotFound(_)
                | ModlogError::ReportNotFound(_)
                | ModlogError::VoteNotFound { .. }
                | ModlogError::ActionNotFound(_)
        )
    }

    /// Errors caused by the caller (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        self.is_not_found()
            || matches!(
                self.root(),
                ModlogError::InvalidArgument(_)
                    | ModlogError::PermissionDenied(_)
                    | ModlogError::Conflict { .. }
            )
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), ModlogError::Conflict { .. })
    }
}

impl From<toml::de::Error> for ModlogError {
    fn from(err: toml::de::Error) -> Self {
        ModlogError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for ModlogError {
    fn from(err: toml::ser::Error) -> Self {
        ModlogError::Toml(err.to_string())
    }
}

/// Result type alias for modlog
pub type Result<T> = std::result::Result<T, ModlogError>;
