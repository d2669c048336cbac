//! Board storage trait and file format

use crate::board::Board;
use crate::error::{ModlogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

/// Persisted board with schema version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardFile {
    /// Schema version for migration
    pub schema_version: String,
    /// The board data
    pub board: Board,
    /// Extra fields for forward compatibility
    #[serde(flatten, default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl BoardFile {
    /// Parse schema version as (major, minor)
    pub fn parse_version(&self) -> Option<(u32, u32)> {
        let (major, minor) = self.schema_version.split_once('.')?;
        Some((major.parse().ok()?, minor.parse().ok()?))
    }

    /// Accept any 1.x file and return its board
    pub fn into_board(self) -> Result<Board> {
        match self.parse_version() {
            Some((1, _)) => Ok(self.board),
            _ => Err(ModlogError::UnsupportedSchemaVersion(format!(
                "{} (expected 1.x)",
                self.schema_version
            ))),
        }
    }
}

/// Borrowed form of [`BoardFile`] used when writing
#[derive(Debug, Serialize)]
pub struct BoardFileRef<'a> {
    pub schema_version: &'a str,
    pub board: &'a Board,
}

impl<'a> BoardFileRef<'a> {
    /// Wrap a board with the current schema version
    pub fn new(board: &'a Board) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            board,
        }
    }
}

/// Exclusive hold on the stored board, released on drop
pub struct StorageLock {
    held: Option<Box<dyn Send>>,
}

impl StorageLock {
    /// Keep `held` alive for as long as the lock
    pub fn holding(held: impl Send + 'static) -> Self {
        Self {
            held: Some(Box::new(held)),
        }
    }

    /// Lock for storage that is never shared between writers
    pub fn uncontended() -> Self {
        Self { held: None }
    }
}

impl fmt::Debug for StorageLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageLock")
            .field("held", &self.held.is_some())
            .finish()
    }
}

/// Persistence for the single board document
pub trait BoardStorage: Send + Sync {
    /// Load the board, `None` when nothing was saved yet
    fn load(&self) -> Result<Option<Board>>;

    /// Replace the stored board
    fn save(&self, board: &Board) -> Result<()>;

    /// Block until no other writer holds the board. Hold the returned
    /// lock across load, change and save.
    fn lock(&self) -> Result<StorageLock> {
        Ok(StorageLock::uncontended())
    }

    /// Load or start empty
    fn load_or_default(&self) -> Result<Board> {
        Ok(self.load()?.unwrap_or_default())
    }
}
