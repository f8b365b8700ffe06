//! Storage traits and error types
//!
//! This module defines the capability every record store offers and the
//! errors it may report.

use crate::record::AppRecord;
use async_trait::async_trait;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row for {slug}: {message}")]
    CorruptRow { slug: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocking store task failed: {0}")]
    TaskJoin(String),
}

impl StoreError {
    /// True when the backend was momentarily unavailable rather than rejecting
    /// the record itself
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Whether a save created the record or refreshed an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Updated,
}

/// Durable, idempotent persistence of records
///
/// Implementations key records by [`AppRecord::id`]. Saving the same identity
/// twice must leave exactly one stored record whose `crawled_on` is the one
/// written by the first save; every other field takes the latest values.
///
/// `record.crawled_on`, when set, is the candidate creation timestamp;
/// otherwise the store uses the current time.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts or refreshes one record
    async fn save(&self, record: &AppRecord) -> StoreResult<SaveOutcome>;

    /// Short name of the backend, for logs
    fn name(&self) -> &'static str;
}
