//! Audit trail of comment changes

pub mod ledger;
pub mod model;

pub use ledger::{ChangeLog, HistorySummary};
pub use model::{format_reason, ChangeLogEntry, ChangeRecord, ChangeType};
