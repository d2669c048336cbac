//! Configuration management for modlog

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Placeholder written over redacted comment content
pub const REMOVED_CONTENT_PLACEHOLDER: &str = "[Content removed by moderator]";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Moderation behaviour
    pub moderation: ModerationConfig,
    /// Content validation
    pub validation: ValidationConfig,
    /// Static permission grants
    pub permissions: PermissionsConfig,
    /// Parent entity context (task/need -> project)
    pub context: ContextConfig,
    /// Storage settings
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Moderation-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Text that replaces removed comment content
    pub removed_content_placeholder: String,
    /// Characters of content included in notification excerpts
    pub excerpt_length: usize,
    /// Report groups with at least this many reports count as high priority
    pub high_priority_threshold: usize,
    /// Entries shown by changelog summaries
    pub summary_entries: usize,
    /// Longest change reason shown before truncation
    pub reason_display_limit: usize,
    /// Upper bound for SUSPEND_USER durations
    pub max_suspension_days: u32,
    /// Notify comment authors about decisions on their comments
    pub notify_authors: bool,
    /// New comments start PENDING instead of APPROVED
    pub pre_moderation: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            removed_content_placeholder: REMOVED_CONTENT_PLACEHOLDER.to_string(),
            excerpt_length: 50,
            high_priority_threshold: 3,
            summary_entries: 3,
            reason_display_limit: 100,
            max_suspension_days: 365,
            notify_authors: true,
            pre_moderation: false,
        }
    }
}

/// Content validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum comment content length
    pub max_comment_length: usize,
    /// Minimum comment content length (after trimming)
    pub min_comment_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_comment_length: 10000,
            min_comment_length: 1,
        }
    }
}

/// Static permission grants, keyed by user id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    pub superusers: Vec<String>,
    pub staff: Vec<String>,
    pub senior_moderators: Vec<String>,
    pub junior_moderators: Vec<String>,
    /// Project id -> users allowed to moderate that project's comments
    pub project_moderators: BTreeMap<String, Vec<String>>,
}

/// Parent entity context used to resolve a comment's project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Task id -> project id
    pub tasks: BTreeMap<String, String>,
    /// Need id -> project id
    pub needs: BTreeMap<String, String>,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the board file
    pub data_dir: Option<PathBuf>,
}
