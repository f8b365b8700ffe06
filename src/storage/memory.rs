//! In-process record store, used for dry crawls and tests

use crate::record::AppRecord;
use crate::storage::traits::{RecordStore, SaveOutcome, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Records kept in a map keyed by slug; lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, AppRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, AppRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, slug: &str) -> Option<AppRecord> {
        self.lock().get(slug).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of every record, ordered by slug
    pub fn records(&self) -> Vec<AppRecord> {
        let mut records: Vec<_> = self.lock().values().cloned().collect();
        records.sort_by_key(AppRecord::id);
        records
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, record: &AppRecord) -> StoreResult<SaveOutcome> {
        let mut stored = record.clone();

        match self.lock().entry(record.id()) {
            Entry::Occupied(mut entry) => {
                stored.crawled_on = entry.get().crawled_on;
                entry.insert(stored);
                Ok(SaveOutcome::Updated)
            }
            Entry::Vacant(entry) => {
                stored.crawled_on = Some(record.crawled_on.unwrap_or_else(Utc::now));
                entry.insert(stored);
                Ok(SaveOutcome::Inserted)
            }
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
