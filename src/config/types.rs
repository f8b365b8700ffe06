use serde::Deserialize;

/// Main configuration structure for Catalog-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawl engine behaviour: worker pool, throttle and retry bounds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers pulling from the task queue
    pub workers: u32,

    /// Maximum number of fetches in flight at once, independent of `workers`
    pub max_concurrent_fetches: u32,

    /// How many times a task failing transiently is requeued before it is
    /// dead-lettered
    pub max_retries: u32,

    /// Total per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// TCP connect timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Treat busy/locked store errors as transient instead of dead-lettering
    pub retry_transient_store_errors: bool,

    /// Stop paginating after this many list pages (0 = no cap)
    pub max_list_pages: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            max_concurrent_fetches: 5,
            max_retries: 3,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            retry_transient_store_errors: false,
            max_list_pages: 0,
        }
    }
}

/// Target site description: where the list pages live and how pagination ends
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Endpoint serving the paginated list
    pub list_url: String,

    /// Query parameter carrying the page index
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Index of the first list page
    #[serde(default = "default_first_page")]
    pub first_page: u32,

    /// Status the site answers with once the page index runs past the end
    #[serde(default)]
    pub end_of_pages_status: Option<u16>,

    /// Unacceptable statuses that are still worth retrying
    #[serde(default = "default_transient_statuses")]
    pub transient_statuses: Vec<u16>,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_first_page() -> u32 {
    1
}

fn default_transient_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Which record store backs a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Record store selected at startup
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Markdown run summary written after each crawl, if set
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Sqlite
}
