//! SQLite record store
//!
//! Records live in the `apps` table keyed by slug. The same database also
//! keeps a log of crawl runs and the tasks each run dead-lettered.
//!
//! The connection sits behind a mutex; async saves run it on the blocking
//! thread pool so workers never stall the runtime on disk I/O.

use crate::crawler::CrawlReport;
use crate::record::{AppRecord, Category};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, SaveOutcome, StoreError, StoreResult};
use crate::storage::{DeadLetterRecord, RunRecord, RunStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// SQLite storage backend
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self::from_connection(conn))
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Records =====

    /// Looks a record up by slug
    pub fn get(&self, slug: &str) -> StoreResult<Option<AppRecord>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT slug, name, description, tags, category, avg_rating, total_reviews,
                 rating_map, is_paid, pricing_plans, developer_name, developer_website, crawled_on
                 FROM apps WHERE slug = ?1",
                params![slug],
                StoredApp::from_row,
            )
            .optional()?;

        row.map(StoredApp::into_record).transpose()
    }

    /// Every stored record, ordered by slug
    #[cfg(test)]
    pub(crate) fn all_records(&self) -> StoreResult<Vec<AppRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT slug, name, description, tags, category, avg_rating, total_reviews,
             rating_map, is_paid, pricing_plans, developer_name, developer_website, crawled_on
             FROM apps ORDER BY slug",
        )?;

        let rows = stmt
            .query_map([], StoredApp::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StoredApp::into_record).collect()
    }

    pub fn count_apps(&self) -> StoreResult<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM apps", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_paid_apps(&self) -> StoreResult<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM apps WHERE is_paid = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Record counts per category, largest first
    pub fn count_by_category(&self) -> StoreResult<Vec<(Category, u64)>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) AS n FROM apps GROUP BY category ORDER BY n DESC, category",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(category, count)| {
                Category::from_db_string(&category).map(|c| (c, count as u64))
            })
            .collect())
    }

    // ===== Run Management =====

    /// Opens a run log entry and returns its ID
    pub fn begin_run(&self, config_hash: &str) -> StoreResult<i64> {
        let conn = self.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Closes a run log entry with the outcome in `report`
    pub fn finish_run(&self, run_id: i64, report: &CrawlReport) -> StoreResult<()> {
        let mut conn = self.lock();
        let status = if report.run_failed() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO dead_letters (run_id, task_kind, target, retry_count, error_kind, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for dead in &report.dead_letters {
                insert.execute(params![
                    run_id,
                    dead.task.kind().to_db_string(),
                    dead.task.target_string(),
                    dead.task.retry_count,
                    dead.error.kind(),
                    dead.error.to_string(),
                ])?;
            }
        }
        tx.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, records_saved = ?3, dead_letter_count = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                Utc::now().to_rfc3339(),
                report.records_saved as i64,
                report.dead_letters.len() as i64,
                run_id
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Most recent runs first
    pub fn recent_runs(&self, limit: usize) -> StoreResult<Vec<RunRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, records_saved, dead_letter_count
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;

        let runs = stmt
            .query_map(params![limit as i64], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Failed),
                    records_saved: row.get::<_, i64>(5)? as u64,
                    dead_letter_count: row.get::<_, i64>(6)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    pub fn dead_letters_for_run(&self, run_id: i64) -> StoreResult<Vec<DeadLetterRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT task_kind, target, retry_count, error_kind, message
             FROM dead_letters WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(DeadLetterRecord {
                    task_kind: row.get(0)?,
                    target: row.get(1)?,
                    retry_count: row.get(2)?,
                    error_kind: row.get(3)?,
                    message: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn save(&self, record: &AppRecord) -> StoreResult<SaveOutcome> {
        let conn = Arc::clone(&self.conn);
        let record = record.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            upsert_app(&mut conn, &record)
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// Inserts or refreshes one app; `crawled_on` is only written on insert
fn upsert_app(conn: &mut Connection, record: &AppRecord) -> StoreResult<SaveOutcome> {
    let slug = record.id();
    let tags = serde_json::to_string(&record.tags)?;
    let rating_map = serde_json::to_string(&record.rating_map)?;
    let pricing_plans = serde_json::to_string(&record.pricing_plans)?;
    let now = Utc::now();

    let tx = conn.transaction()?;
    let exists = tx
        .query_row("SELECT 1 FROM apps WHERE slug = ?1", params![slug], |_| Ok(()))
        .optional()?
        .is_some();

    let outcome = if exists {
        tx.execute(
            "UPDATE apps SET name = ?2, description = ?3, tags = ?4, category = ?5,
             avg_rating = ?6, total_reviews = ?7, rating_map = ?8, is_paid = ?9,
             pricing_plans = ?10, developer_name = ?11, developer_website = ?12, updated_at = ?13
             WHERE slug = ?1",
            params![
                slug,
                record.name,
                record.description,
                tags,
                record.category.to_db_string(),
                record.avg_rating,
                record.total_reviews,
                rating_map,
                record.is_paid,
                pricing_plans,
                record.developer_name,
                record.developer_website,
                now.to_rfc3339(),
            ],
        )?;
        SaveOutcome::Updated
    } else {
        let crawled_on = record.crawled_on.unwrap_or(now);
        tx.execute(
            "INSERT INTO apps (slug, name, description, tags, category, avg_rating, total_reviews,
             rating_map, is_paid, pricing_plans, developer_name, developer_website, crawled_on, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                slug,
                record.name,
                record.description,
                tags,
                record.category.to_db_string(),
                record.avg_rating,
                record.total_reviews,
                rating_map,
                record.is_paid,
                pricing_plans,
                record.developer_name,
                record.developer_website,
                crawled_on.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        SaveOutcome::Inserted
    };

    tx.commit()?;
    Ok(outcome)
}

/// An `apps` row before its JSON and enum columns are decoded
struct StoredApp {
    slug: String,
    name: String,
    description: String,
    tags: String,
    category: String,
    avg_rating: f64,
    total_reviews: u32,
    rating_map: String,
    is_paid: bool,
    pricing_plans: String,
    developer_name: String,
    developer_website: Option<String>,
    crawled_on: String,
}

impl StoredApp {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            slug: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            tags: row.get(3)?,
            category: row.get(4)?,
            avg_rating: row.get(5)?,
            total_reviews: row.get(6)?,
            rating_map: row.get(7)?,
            is_paid: row.get(8)?,
            pricing_plans: row.get(9)?,
            developer_name: row.get(10)?,
            developer_website: row.get(11)?,
            crawled_on: row.get(12)?,
        })
    }

    fn into_record(self) -> StoreResult<AppRecord> {
        let corrupt = |message: String| StoreError::CorruptRow {
            slug: self.slug.clone(),
            message,
        };

        let category = Category::from_db_string(&self.category)
            .ok_or_else(|| corrupt(format!("unknown category {}", self.category)))?;
        let crawled_on = DateTime::parse_from_rfc3339(&self.crawled_on)
            .map_err(|e| corrupt(format!("bad crawled_on: {}", e)))?
            .with_timezone(&Utc);

        Ok(AppRecord {
            tags: serde_json::from_str(&self.tags)?,
            rating_map: serde_json::from_str(&self.rating_map)?,
            pricing_plans: serde_json::from_str(&self.pricing_plans)?,
            name: self.name,
            description: self.description,
            category,
            avg_rating: self.avg_rating,
            total_reviews: self.total_reviews,
            is_paid: self.is_paid,
            developer_name: self.developer_name,
            developer_website: self.developer_website,
            crawled_on: Some(crawled_on),
        })
    }
}
