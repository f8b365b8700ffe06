//! Markdown run summary
//!
//! Written after a crawl when `output.summary-path` is set, so a run can be
//! reviewed without querying the database.

use crate::crawler::{CrawlReport, TaskKind};
use crate::output::report::format_dead_letter;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of a run to `output_path`
///
/// # Arguments
///
/// * `report` - The finished run
/// * `config_hash` - Hash of the config the run used
/// * `finished_at` - When the run finished
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(
    report: &CrawlReport,
    config_hash: &str,
    finished_at: DateTime<Utc>,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_summary(report, config_hash, finished_at);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run as markdown
pub fn format_markdown_summary(
    report: &CrawlReport,
    config_hash: &str,
    finished_at: DateTime<Utc>,
) -> String {
    let mut md = String::new();

    md.push_str("# Catalog Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Finished**: {}\n", finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        report.elapsed.as_secs_f64()
    ));
    let status = if report.run_failed() {
        "failed"
    } else {
        "completed"
    };
    md.push_str(&format!("- **Status**: {}\n", status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", config_hash));

    md.push_str("## Records\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Saved | {} |\n", report.records_saved));
    md.push_str(&format!("| New | {} |\n", report.records_inserted));
    md.push_str(&format!("| Refreshed | {} |\n\n", report.records_updated));

    md.push_str("## Traffic\n\n");
    md.push_str(&format!("- **List Pages**: {}\n", report.list_pages));
    md.push_str(&format!("- **Detail Pages**: {}\n", report.detail_pages));
    md.push_str(&format!("- **Retries**: {}\n", report.retries));
    md.push_str(&format!(
        "- **Peak Concurrent Fetches**: {}\n\n",
        report.peak_concurrent_fetches
    ));

    md.push_str("## Dead Letters\n\n");
    if report.dead_letters.is_empty() {
        md.push_str("None.\n");
    } else {
        for kind in [TaskKind::List, TaskKind::Detail] {
            let letters: Vec<_> = report
                .dead_letters
                .iter()
                .filter(|dead| dead.task.kind() == kind)
                .collect();
            if letters.is_empty() {
                continue;
            }

            md.push_str(&format!(
                "### {} tasks ({})\n\n",
                match kind {
                    TaskKind::List => "List",
                    TaskKind::Detail => "Detail",
                },
                letters.len()
            ));
            for dead in letters {
                md.push_str(&format!("- {}\n", format_dead_letter(dead)));
            }
            md.push('\n');
        }
    }

    md
}
