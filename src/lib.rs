//! Catalog-Crawler: a polite crawler for paginated catalog sites
//!
//! This crate walks the list pages of a catalog, follows every detail link it
//! finds, parses each detail page into an [`AppRecord`] and upserts it into a
//! [`RecordStore`]. The crawl engine runs a fixed pool of workers over a shared
//! task queue, caps simultaneous fetches with a throttle, retries transient
//! failures a bounded number of times and dead-letters everything else.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod site;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Crawler operations
///
/// Individual task failures never surface here; they are classified as
/// [`crawler::TaskFailure`] and end up in the dead-letter list of the run.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl engine is single-use and already {state:?}")]
    EngineReused { state: crawler::EngineState },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Catalog-Crawler operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlReport, CrawlTask, DeadLetter, TaskFailure};
pub use record::{slugify, AppRecord, Category};
pub use site::{ListOutcome, PageParser, ParseError};
pub use storage::{RecordStore, SaveOutcome, StoreError};
