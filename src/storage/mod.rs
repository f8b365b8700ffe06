//! Storage module for persisting crawl results
//!
//! This module handles:
//! - The [`RecordStore`] capability the crawl engine saves records through
//! - A SQLite backend with a log of runs and their dead letters
//! - An in-memory backend for dry crawls and tests

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;
pub use traits::{RecordStore, SaveOutcome, StoreError, StoreResult};

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub records_saved: u64,
    pub dead_letter_count: u64,
}

/// A dead-lettered task as written to the run log
#[derive(Debug, Clone)]
pub struct DeadLetterRecord {
    pub task_kind: String,
    pub target: String,
    pub retry_count: u32,
    pub error_kind: String,
    pub message: String,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// The seed list page was dead-lettered
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
