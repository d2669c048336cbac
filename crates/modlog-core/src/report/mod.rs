//! Comment reports and their per-comment groups

pub mod book;
pub mod group;
pub mod model;

pub use book::{NewReport, ReportBook};
pub use group::{CommentReportGroup, GroupQuery, GroupSort, GroupStats};
pub use model::{CommentReport, ReportStatus, ReportType};
