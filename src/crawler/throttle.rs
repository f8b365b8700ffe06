//! Global bound on in-flight HTTP fetches

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};

/// Counting semaphore shared by every worker
///
/// Also records how many fetches were in flight at once, so runs can report
/// the peak.
#[derive(Debug)]
pub struct Throttle {
    semaphore: Semaphore,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// One slot of the throttle, released on drop
#[derive(Debug)]
pub struct ThrottlePermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for ThrottlePermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Throttle {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Waits for a free slot
    ///
    /// Returns `None` once the throttle has been closed.
    pub async fn acquire(&self) -> Option<ThrottlePermit<'_>> {
        let permit = self.semaphore.acquire().await.ok()?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Some(ThrottlePermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    /// Fails every pending and future acquire
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
