//! FIFO task queue with an outstanding-work counter
//!
//! Every `put` raises the outstanding count and every processed task lowers it
//! again through `task_done`. A task still sitting in the queue or being worked
//! on is outstanding, so the count reaching zero means the crawl has no work
//! left anywhere and `drain` returns.
//!
//! Workers that requeue a task call `put` for the new task before `task_done`
//! for the old one, so the count never touches zero mid-retry.

use crate::crawler::task::CrawlTask;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;

/// `task_done` was called more times than `put`
#[derive(Debug, Error, PartialEq, Eq)]
#[error("task_done called with no outstanding tasks")]
pub struct UnbalancedTaskDone;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<CrawlTask>,
    outstanding: usize,
}

/// Unbounded multi-producer multi-consumer queue of crawl tasks
#[derive(Debug, Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Notify,
    drained: Notify,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a task and counts it as outstanding
    pub fn put(&self, task: CrawlTask) {
        {
            let mut state = self.lock();
            state.items.push_back(task);
            state.outstanding += 1;
        }
        self.available.notify_one();
    }

    /// Waits for the next task in FIFO order
    ///
    /// Cancel safe: a task is only removed in the same poll that returns it.
    pub async fn get(&self) -> CrawlTask {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next = self.lock().items.pop_front();
            if let Some(task) = next {
                return task;
            }

            notified.await;
        }
    }

    /// Takes the next task without waiting
    pub fn try_get(&self) -> Option<CrawlTask> {
        self.lock().items.pop_front()
    }

    /// Marks one previously received task as fully processed
    ///
    /// Returns the remaining outstanding count.
    pub fn task_done(&self) -> Result<usize, UnbalancedTaskDone> {
        let remaining = {
            let mut state = self.lock();
            if state.outstanding == 0 {
                return Err(UnbalancedTaskDone);
            }
            state.outstanding -= 1;
            state.outstanding
        };

        if remaining == 0 {
            self.drained.notify_waiters();
        }
        Ok(remaining)
    }

    /// Waits until every task ever put has been marked done
    ///
    /// Returns immediately when nothing is outstanding.
    pub async fn drain(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let outstanding = self.lock().outstanding;
            if outstanding == 0 {
                return;
            }

            notified.await;
        }
    }

    /// Tasks put but not yet marked done
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }
}
