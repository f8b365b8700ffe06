//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Catalog-Crawler database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per app, keyed by the slug of its name
CREATE TABLE IF NOT EXISTS apps (
    slug TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    tags TEXT NOT NULL,
    category TEXT NOT NULL,
    avg_rating REAL NOT NULL,
    total_reviews INTEGER NOT NULL,
    rating_map TEXT NOT NULL,
    is_paid INTEGER NOT NULL,
    pricing_plans TEXT NOT NULL,
    developer_name TEXT NOT NULL,
    developer_website TEXT,
    crawled_on TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_apps_category ON apps(category);

-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    records_saved INTEGER NOT NULL DEFAULT 0,
    dead_letter_count INTEGER NOT NULL DEFAULT 0
);

-- Tasks abandoned by a run, for operator review
CREATE TABLE IF NOT EXISTS dead_letters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    task_kind TEXT NOT NULL,
    target TEXT NOT NULL,
    retry_count INTEGER NOT NULL,
    error_kind TEXT NOT NULL,
    message TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dead_letters_run ON dead_letters(run_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
