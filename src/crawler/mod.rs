//! Crawler module for catalog traversal
//!
//! This module contains the core crawling logic, including:
//! - The task queue and its outstanding-work counter
//! - The global fetch throttle and the HTTP fetcher
//! - Retry and dead-letter handling
//! - List/detail task handlers run by a fixed worker pool
//! - The crawl engine that ties one run together

mod engine;
mod fetcher;
mod queue;
mod retry;
mod task;
mod throttle;
mod worker;

pub use engine::{CrawlEngine, CrawlReport, EngineSettings, EngineState};
pub use fetcher::{build_http_client, FetchResult, Fetcher};
pub use queue::{TaskQueue, UnbalancedTaskDone};
pub use retry::{DeadLetter, RetryAction, RetryPolicy, TaskFailure};
pub use task::{CrawlTask, TaskKind, TaskTarget};
pub use throttle::{Throttle, ThrottlePermit};

use crate::config::{Config, StoreBackend};
use crate::site::{AppStoreParser, PageParser};
use crate::storage::{MemoryRecordStore, SqliteRecordStore, StoreError, StoreResult};
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the configured record store
/// 2. Open a run log entry (SQLite backend only)
/// 3. Crawl the catalogue with the app store parser
/// 4. Close the run log entry with the outcome
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the config file, recorded with the run
pub async fn crawl(config: &Config, config_hash: &str) -> Result<CrawlReport> {
    let parser: Arc<dyn PageParser> = Arc::new(AppStoreParser::new());

    match config.output.backend {
        StoreBackend::Memory => {
            let store = Arc::new(MemoryRecordStore::new());
            let mut engine = CrawlEngine::from_config(config, parser, store)?;
            engine.run().await
        }
        StoreBackend::Sqlite => {
            let path = PathBuf::from(&config.output.database_path);
            let store = Arc::new(
                tokio::task::spawn_blocking(move || SqliteRecordStore::new(&path))
                    .await
                    .map_err(|e| StoreError::TaskJoin(e.to_string()))??,
            );

            let hash = config_hash.to_string();
            let run_id = on_blocking_pool(&store, move |store| store.begin_run(&hash)).await?;
            tracing::info!("Starting crawl run {}", run_id);

            let mut engine = CrawlEngine::from_config(config, parser, store.clone())?;
            let report = engine.run().await?;

            Ok(close_run(&store, run_id, report).await)
        }
    }
}

/// Runs a synchronous SQLite call without blocking the async workers
async fn on_blocking_pool<T, F>(store: &Arc<SqliteRecordStore>, f: F) -> StoreResult<T>
where
    F: FnOnce(&SqliteRecordStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
}

/// Records the outcome of a run
///
/// A failure to write the run log is logged; the report is returned either way.
async fn close_run(store: &Arc<SqliteRecordStore>, run_id: i64, report: CrawlReport) -> CrawlReport {
    let logged = report.clone();
    match on_blocking_pool(store, move |store| store.finish_run(run_id, &logged)).await {
        Ok(()) => tracing::debug!("Closed crawl run {}", run_id),
        Err(e) => tracing::error!("Failed to record the outcome of run {}: {}", run_id, e),
    }
    report
}
