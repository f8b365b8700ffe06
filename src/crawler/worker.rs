//! Worker loop and the list/detail task handlers

use crate::crawler::engine::EngineSettings;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::queue::TaskQueue;
use crate::crawler::retry::{DeadLetter, RetryAction, RetryPolicy, TaskFailure};
use crate::crawler::task::{CrawlTask, TaskTarget};
use crate::site::{ListOutcome, PageParser};
use crate::storage::{RecordStore, SaveOutcome};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Tasks between progress log lines
const PROGRESS_INTERVAL: usize = 25;

/// Per-run tallies, updated by every worker
#[derive(Debug, Default)]
pub(crate) struct RunCounters {
    pub saved: AtomicUsize,
    pub inserted: AtomicUsize,
    pub updated: AtomicUsize,
    pub list_pages: AtomicUsize,
    pub detail_pages: AtomicUsize,
    pub retries: AtomicUsize,
    pub completed: AtomicUsize,
}

impl RunCounters {
    fn bump(counter: &AtomicUsize) -> usize {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::Relaxed)
    }
}

/// State of one run, shared by all of its workers
pub(crate) struct WorkerContext {
    pub queue: TaskQueue,
    pub fetcher: Fetcher,
    pub parser: Arc<dyn PageParser>,
    pub store: Arc<dyn RecordStore>,
    pub retry: RetryPolicy,
    pub settings: EngineSettings,
    pub dead_letters: Mutex<Vec<DeadLetter>>,
    pub counters: RunCounters,
}

impl WorkerContext {
    pub fn new(
        fetcher: Fetcher,
        parser: Arc<dyn PageParser>,
        store: Arc<dyn RecordStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            queue: TaskQueue::new(),
            fetcher,
            parser,
            store,
            retry: RetryPolicy::new(settings.max_retries),
            settings,
            dead_letters: Mutex::new(Vec::new()),
            counters: RunCounters::default(),
        }
    }

    fn dead_letter_count(&self) -> usize {
        self.dead_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn take_dead_letters(&self) -> Vec<DeadLetter> {
        std::mem::take(&mut *self.dead_letters.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn process(&self, task: CrawlTask) {
        match task.target.clone() {
            TaskTarget::ListPage(page) => self.crawl_list_page(task, page).await,
            TaskTarget::DetailPage(url) => self.crawl_detail_page(task, &url).await,
        }
    }

    async fn crawl_list_page(&self, task: CrawlTask, page: u32) {
        let settings = &self.settings;
        let params = [(settings.page_param.as_str(), page.to_string())];
        let accept = settings.end_of_pages_status.as_slice();

        let body = match self.fetcher.fetch(&settings.list_url, &params, accept).await {
            FetchResult::Ok { status, .. } if Some(status) == settings.end_of_pages_status => {
                tracing::info!("List page {} returned {}, end of list", page, status);
                return;
            }
            FetchResult::Ok { body, .. } => body,
            FetchResult::HttpError { status, transient } => {
                return self.fail(task, TaskFailure::HttpStatus { status, transient });
            }
            FetchResult::NetworkError { cause } => {
                return self.fail(task, TaskFailure::Network(cause));
            }
        };
        RunCounters::bump(&self.counters.list_pages);

        let page_url = settings.list_page_url(page);
        let links = match self.parser.parse_list(&body, &page_url) {
            ListOutcome::Links(links) => links,
            ListOutcome::End => {
                tracing::info!("List page {} has no items, end of list", page);
                return;
            }
        };

        tracing::debug!("List page {} yielded {} detail links", page, links.len());
        for link in links {
            self.queue.put(CrawlTask::detail(link));
        }

        if settings.has_page_after(page) {
            self.queue.put(CrawlTask::list(page + 1));
        } else {
            tracing::info!("Stopping pagination at page {} (max-list-pages)", page);
        }
    }

    async fn crawl_detail_page(&self, task: CrawlTask, url: &Url) {
        let body = match self.fetcher.fetch(url, &[], &[]).await {
            FetchResult::Ok { body, .. } => body,
            FetchResult::HttpError { status, transient } => {
                return self.fail(task, TaskFailure::HttpStatus { status, transient });
            }
            FetchResult::NetworkError { cause } => {
                return self.fail(task, TaskFailure::Network(cause));
            }
        };
        RunCounters::bump(&self.counters.detail_pages);

        let record = match self.parser.parse_detail(&body, url) {
            Ok(record) => record,
            Err(e) => return self.fail(task, TaskFailure::Parse(e.to_string())),
        };

        match self.store.save(&record).await {
            Ok(outcome) => {
                RunCounters::bump(&self.counters.saved);
                match outcome {
                    SaveOutcome::Inserted => RunCounters::bump(&self.counters.inserted),
                    SaveOutcome::Updated => RunCounters::bump(&self.counters.updated),
                };
                tracing::debug!("Saved {} ({:?})", record.id(), outcome);
            }
            Err(e) => {
                let failure =
                    TaskFailure::from_store_error(&e, self.settings.retry_transient_store_errors);
                self.fail(task, failure);
            }
        }
    }

    /// Requeues or dead-letters a failed task
    fn fail(&self, task: CrawlTask, failure: TaskFailure) {
        match self.retry.on_failure(task, failure) {
            RetryAction::Requeue(retry) => {
                RunCounters::bump(&self.counters.retries);
                tracing::warn!("Retrying {}", retry);
                self.queue.put(retry);
            }
            RetryAction::DeadLetter(dead) => self.dead_letter(dead),
        }
    }

    fn dead_letter(&self, dead: DeadLetter) {
        tracing::warn!("Giving up on {}: {}", dead.task, dead.error);
        self.dead_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dead);
    }
}

/// Takes tasks off the queue until cancelled
///
/// Every task taken is marked done exactly once, even when its handler
/// panics.
pub(crate) async fn run_worker(ctx: Arc<WorkerContext>, cancel: CancellationToken) {
    loop {
        let task = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            task = ctx.queue.get() => task,
        };

        tracing::debug!("Processing {}", task);
        let outcome = AssertUnwindSafe(ctx.process(task.clone()))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            let message = panic_message(&*panic);
            tracing::error!("Worker fault while processing {}: {}", task, message);
            ctx.dead_letter(DeadLetter {
                task,
                error: TaskFailure::Fault(message),
            });
        }

        if let Err(e) = ctx.queue.task_done() {
            tracing::error!("{}", e);
        }

        let completed = RunCounters::bump(&ctx.counters.completed);
        if completed % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} tasks done, {} outstanding, {} records saved, {} dead letters",
                completed,
                ctx.queue.outstanding(),
                RunCounters::get(&ctx.counters.saved),
                ctx.dead_letter_count()
            );
        }
    }
    tracing::debug!("Worker stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
