//! Statistics generation from the catalog database
//!
//! This module provides functionality for extracting and displaying
//! catalog and run statistics from the SQLite store.

use crate::record::Category;
use crate::storage::{DeadLetterRecord, RunRecord, SqliteRecordStore, StoreResult};

/// Runs shown by `--stats`
const RECENT_RUNS: usize = 5;

/// Catalog statistics summary
#[derive(Debug, Clone)]
pub struct CatalogStatistics {
    /// Total number of apps stored
    pub total_apps: u64,

    /// Apps with a paid plan
    pub paid_apps: u64,

    /// App counts per category, largest first
    pub apps_by_category: Vec<(Category, u64)>,

    /// Most recent runs first
    pub recent_runs: Vec<RunRecord>,

    /// Dead letters of the most recent run
    pub latest_dead_letters: Vec<DeadLetterRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(store: &SqliteRecordStore) -> StoreResult<CatalogStatistics> {
    let recent_runs = store.recent_runs(RECENT_RUNS)?;
    let latest_dead_letters = match recent_runs.first() {
        Some(run) => store.dead_letters_for_run(run.id)?,
        None => Vec::new(),
    };

    Ok(CatalogStatistics {
        total_apps: store.count_apps()?,
        paid_apps: store.count_paid_apps()?,
        apps_by_category: store.count_by_category()?,
        recent_runs,
        latest_dead_letters,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Total apps: {}", stats.total_apps);
    let paid_share = if stats.total_apps > 0 {
        (stats.paid_apps as f64 / stats.total_apps as f64) * 100.0
    } else {
        0.0
    };
    println!("  Paid apps: {} ({:.1}%)", stats.paid_apps, paid_share);
    println!();

    if !stats.apps_by_category.is_empty() {
        println!("Apps by Category:");
        for (category, count) in &stats.apps_by_category {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    if stats.recent_runs.is_empty() {
        println!("No crawl runs recorded");
        return;
    }

    println!("Recent Runs:");
    for run in &stats.recent_runs {
        println!(
            "  #{} {} [{}] {} saved, {} dead letters",
            run.id,
            run.started_at,
            run.status.to_db_string(),
            run.records_saved,
            run.dead_letter_count
        );
    }

    if !stats.latest_dead_letters.is_empty() {
        println!(
            "\nDead Letters of Run #{} ({}):",
            stats.recent_runs[0].id,
            stats.latest_dead_letters.len()
        );
        for dead in &stats.latest_dead_letters {
            println!(
                "  - {} {} after {} retries [{}]: {}",
                dead.task_kind, dead.target, dead.retry_count, dead.error_kind, dead.message
            );
        }
    }
}
