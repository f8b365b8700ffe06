//! Catalog-Crawler main entry point
//!
//! This is the command-line interface for the Catalog-Crawler.

use catalog_crawler::config::{load_config_with_hash, validate, Config, StoreBackend};
use catalog_crawler::crawler::crawl;
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Crawler: a polite crawler for paginated catalogs
///
/// Catalog-Crawler walks every list page of a catalog, follows each detail
/// link, and upserts the parsed records into a local database. Transient
/// failures are retried a bounded number of times; everything that still
/// fails is reported as a dead letter.
#[derive(Parser, Debug)]
#[command(name = "catalog-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A polite crawler for paginated catalogs", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the number of workers from the config file
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(workers) = cli.workers {
        tracing::info!("Overriding workers: {} -> {}", config.crawler.workers, workers);
        config.crawler.workers = workers;
        if let Err(e) = validate(&config) {
            tracing::error!("Invalid --workers override: {}", e);
            return Err(e.into());
        }
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_crawler=info,warn"),
            1 => EnvFilter::new("catalog_crawler=debug,info"),
            2 => EnvFilter::new("catalog_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Max retries: {}", config.crawler.max_retries);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.crawler.request_timeout_secs, config.crawler.connect_timeout_secs
    );
    println!(
        "  Retry transient store errors: {}",
        config.crawler.retry_transient_store_errors
    );
    match config.crawler.max_list_pages {
        0 => println!("  Max list pages: unbounded"),
        n => println!("  Max list pages: {}", n),
    }

    println!("\nSite:");
    println!("  List URL: {}", config.site.list_url);
    println!(
        "  Pagination: ?{}={} onwards",
        config.site.page_param, config.site.first_page
    );
    match config.site.end_of_pages_status {
        Some(status) => println!("  End of pages: HTTP {} or an empty list page", status),
        None => println!("  End of pages: an empty list page"),
    }
    println!("  Transient statuses: {:?}", config.site.transient_statuses);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Backend: {:?}", config.output.backend);
    println!("  Database: {}", config.output.database_path);
    if let Some(summary_path) = &config.output.summary_path {
        println!("  Summary: {}", summary_path);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use catalog_crawler::output::{load_statistics, print_statistics};
    use catalog_crawler::storage::SqliteRecordStore;

    if config.output.backend == StoreBackend::Memory {
        return Err("--stats needs the sqlite backend".into());
    }

    println!("Database: {}\n", config.output.database_path);

    // Open the database
    let store = SqliteRecordStore::new(Path::new(&config.output.database_path))?;

    // Load statistics
    let stats = load_statistics(&store)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    use catalog_crawler::output::{generate_markdown_summary, print_report};

    tracing::info!(
        "Crawling {} with {} workers and {} concurrent fetches",
        config.site.list_url,
        config.crawler.workers,
        config.crawler.max_concurrent_fetches
    );

    // Run the crawler
    let report = match crawl(config, config_hash).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_report(&report);

    if let Some(summary_path) = &config.output.summary_path {
        generate_markdown_summary(&report, config_hash, Utc::now(), Path::new(summary_path))?;
        tracing::info!("Summary written to: {}", summary_path);
    }

    if report.run_failed() {
        tracing::error!("Seed list page could not be crawled");
        return Err("crawl failed: seed list page was dead-lettered".into());
    }

    tracing::info!("Crawl completed successfully");
    Ok(())
}
