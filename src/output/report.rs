//! End-of-run report printed to stdout

use crate::crawler::{CrawlReport, DeadLetter};

/// One dead letter as a single line
pub fn format_dead_letter(dead: &DeadLetter) -> String {
    format!(
        "{} after {} retries: {}",
        dead.task, dead.task.retry_count, dead.error
    )
}

/// Prints the outcome of a run
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Records:");
    println!("  Saved: {}", report.records_saved);
    println!("  New: {}", report.records_inserted);
    println!("  Refreshed: {}", report.records_updated);
    println!();

    println!("Pages:");
    println!("  List pages crawled: {}", report.list_pages);
    println!("  Detail pages crawled: {}", report.detail_pages);
    println!("  Retries issued: {}", report.retries);
    println!(
        "  Peak concurrent fetches: {}",
        report.peak_concurrent_fetches
    );
    println!();

    println!(
        "Elapsed: {:.1}s ({:.2} records/sec)",
        report.elapsed.as_secs_f64(),
        report.records_per_second()
    );

    if report.dead_letters.is_empty() {
        println!("Dead letters: none");
    } else {
        println!("\nDead letters ({}):", report.dead_letters.len());
        for dead in &report.dead_letters {
            println!("  - {}", format_dead_letter(dead));
        }
    }

    if report.run_failed() {
        println!("\nRun FAILED: seed list page {} could not be crawled", report.first_page);
    }
}
