//! Failure classification and the retry/dead-letter decision
//!
//! | Failure | Retryable |
//! |---------|-----------|
//! | network error (connect, timeout, body read) | always |
//! | HTTP status | only statuses configured as transient |
//! | parse error | never |
//! | store error | only busy/locked, and only when enabled |
//! | worker fault | never |
//!
//! A retryable failure requeues the task with `retry_count + 1` while
//! `retry_count < max_retries`; after that, and for every other failure, the
//! task is dead-lettered exactly once.

use crate::crawler::task::CrawlTask;
use crate::storage::StoreError;
use thiserror::Error;

/// Why a task did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {status}")]
    HttpStatus { status: u16, transient: bool },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("store error: {message}")]
    Store { message: String, transient: bool },

    #[error("worker fault: {0}")]
    Fault(String),
}

impl TaskFailure {
    /// Classifies a store error; busy/locked errors count as transient only
    /// when `retry_transient` is enabled
    pub fn from_store_error(error: &StoreError, retry_transient: bool) -> Self {
        Self::Store {
            message: error.to_string(),
            transient: retry_transient && error.is_transient(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::HttpStatus { transient, .. } => *transient,
            Self::Store { transient, .. } => *transient,
            Self::Parse(_) | Self::Fault(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::HttpStatus { .. } => "http_status",
            Self::Parse(_) => "parse",
            Self::Store { .. } => "store",
            Self::Fault(_) => "fault",
        }
    }
}

/// A task abandoned for good, with the error that ended it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub task: CrawlTask,
    pub error: TaskFailure,
}

/// What to do with a failed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAction {
    Requeue(CrawlTask),
    DeadLetter(DeadLetter),
}

/// Bounded retry decision
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Routes any failure: permanent ones go straight to the dead-letter list
    pub fn on_failure(&self, task: CrawlTask, error: TaskFailure) -> RetryAction {
        if error.is_retryable() {
            self.on_transient_failure(task, error)
        } else {
            RetryAction::DeadLetter(DeadLetter { task, error })
        }
    }

    /// Requeues while the task still has retries left
    pub fn on_transient_failure(&self, task: CrawlTask, error: TaskFailure) -> RetryAction {
        if task.retry_count < self.max_retries {
            RetryAction::Requeue(task.retried())
        } else {
            RetryAction::DeadLetter(DeadLetter { task, error })
        }
    }
}
