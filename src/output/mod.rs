//! Output module for run reports and catalog statistics
//!
//! This module handles:
//! - Printing the end-of-run report
//! - Writing a markdown summary of a run
//! - Displaying catalog statistics from the database

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::{format_dead_letter, print_report};
pub use stats::{load_statistics, print_statistics, CatalogStatistics};
