//! Crawl engine: owns one run from seed to report
//!
//! A run moves through `Idle -> Running -> Draining -> Stopped`:
//!
//! 1. Seed the queue with the first list page and start the worker pool
//! 2. Wait for the queue to drain (every task put has been marked done)
//! 3. Cancel the now idle workers, close the throttle and join them
//! 4. Build the report and release the HTTP client
//!
//! An engine runs at most once.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, Fetcher};
use crate::crawler::retry::DeadLetter;
use crate::crawler::task::{CrawlTask, TaskTarget};
use crate::crawler::throttle::Throttle;
use crate::crawler::worker::{run_worker, RunCounters, WorkerContext};
use crate::site::PageParser;
use crate::storage::RecordStore;
use crate::{CatalogError, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

/// Lifecycle of a [`CrawlEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, not yet run
    Idle,
    /// Workers are processing tasks
    Running,
    /// Queue drained, workers shutting down
    Draining,
    /// Run finished
    Stopped,
}

/// Everything a run needs to know about the site and its own limits
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub workers: usize,
    pub max_retries: u32,
    pub retry_transient_store_errors: bool,
    pub list_url: Url,
    pub page_param: String,
    pub first_page: u32,
    pub end_of_pages_status: Option<u16>,

    /// 0 = follow pagination until the site signals the end
    pub max_list_pages: u32,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            workers: config.crawler.workers as usize,
            max_retries: config.crawler.max_retries,
            retry_transient_store_errors: config.crawler.retry_transient_store_errors,
            list_url: Url::parse(&config.site.list_url)?,
            page_param: config.site.page_param.clone(),
            first_page: config.site.first_page,
            end_of_pages_status: config.site.end_of_pages_status,
            max_list_pages: config.crawler.max_list_pages,
        })
    }

    /// The list URL with the page parameter set, as seen by the parser
    pub fn list_page_url(&self, page: u32) -> Url {
        let mut url = self.list_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.page_param, &page.to_string());
        url
    }

    /// Whether pagination may continue past `page`
    pub fn has_page_after(&self, page: u32) -> bool {
        if page == u32::MAX {
            return false;
        }
        self.max_list_pages == 0 || page.saturating_sub(self.first_page) + 1 < self.max_list_pages
    }
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Index of the seed list page
    pub first_page: u32,
    pub records_saved: usize,
    pub records_inserted: usize,
    pub records_updated: usize,
    pub list_pages: usize,
    pub detail_pages: usize,
    pub retries: usize,
    pub tasks_completed: usize,
    pub peak_concurrent_fetches: usize,
    pub elapsed: Duration,
    pub dead_letters: Vec<DeadLetter>,
}

impl CrawlReport {
    /// True when the seed list page itself was abandoned, so nothing past it
    /// could have been discovered
    pub fn run_failed(&self) -> bool {
        self.dead_letters
            .iter()
            .any(|dead| dead.task.target == TaskTarget::ListPage(self.first_page))
    }

    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records_saved as f64 / secs
        } else {
            0.0
        }
    }
}

/// Runs one crawl with a fixed pool of workers
pub struct CrawlEngine {
    settings: EngineSettings,
    fetcher: Option<Fetcher>,
    parser: Arc<dyn PageParser>,
    store: Arc<dyn RecordStore>,
    state: EngineState,
}

impl CrawlEngine {
    pub fn new(
        settings: EngineSettings,
        fetcher: Fetcher,
        parser: Arc<dyn PageParser>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            settings,
            fetcher: Some(fetcher),
            parser,
            store,
            state: EngineState::Idle,
        }
    }

    /// Builds the HTTP client and throttle described by `config`
    pub fn from_config(
        config: &Config,
        parser: Arc<dyn PageParser>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        let settings = EngineSettings::from_config(config)?;
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let throttle = Arc::new(Throttle::new(
            config.crawler.max_concurrent_fetches as usize,
        ));
        let fetcher = Fetcher::new(client, throttle, config.site.transient_statuses.clone());

        Ok(Self::new(settings, fetcher, parser, store))
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Crawls until no task is outstanding and reports what happened
    ///
    /// Task failures never fail the run; they are listed in the report's
    /// dead letters. Calling `run` a second time is an error.
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let fetcher = match (self.state, self.fetcher.take()) {
            (EngineState::Idle, Some(fetcher)) => fetcher,
            (state, _) => return Err(CatalogError::EngineReused { state }),
        };

        let start_time = Instant::now();
        let throttle = Arc::clone(fetcher.throttle());
        let workers = self.settings.workers.max(1);
        let ctx = Arc::new(WorkerContext::new(
            fetcher,
            Arc::clone(&self.parser),
            Arc::clone(&self.store),
            self.settings.clone(),
        ));

        self.state = EngineState::Running;
        tracing::info!(
            "Starting crawl of {} with {} workers, {} concurrent fetches, {} store",
            self.settings.list_url,
            workers,
            throttle.capacity(),
            self.store.name()
        );

        ctx.queue.put(CrawlTask::list(self.settings.first_page));

        // Stops the workers even when this future is dropped before the drain
        let cancel = CancellationToken::new();
        let _stop_workers = cancel.clone().drop_guard();
        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let span = tracing::info_span!("worker", id);
                tokio::spawn(run_worker(Arc::clone(&ctx), cancel.clone()).instrument(span))
            })
            .collect();

        ctx.queue.drain().await;

        self.state = EngineState::Draining;
        tracing::debug!("Queue drained, stopping {} workers", workers);
        cancel.cancel();
        throttle.close();

        for result in join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        let counters = &ctx.counters;
        let report = CrawlReport {
            first_page: self.settings.first_page,
            records_saved: RunCounters::get(&counters.saved),
            records_inserted: RunCounters::get(&counters.inserted),
            records_updated: RunCounters::get(&counters.updated),
            list_pages: RunCounters::get(&counters.list_pages),
            detail_pages: RunCounters::get(&counters.detail_pages),
            retries: RunCounters::get(&counters.retries),
            tasks_completed: RunCounters::get(&counters.completed),
            peak_concurrent_fetches: throttle.peak(),
            elapsed: start_time.elapsed(),
            dead_letters: ctx.take_dead_letters(),
        };
        self.state = EngineState::Stopped;

        tracing::info!(
            "Crawl completed: {} records saved, {} dead letters in {:?}",
            report.records_saved,
            report.dead_letters.len(),
            report.elapsed
        );

        Ok(report)
    }
}
