//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock catalog sites and run the full
//! crawl engine end-to-end against a real SQLite store.

use catalog_crawler::config::{
    Config, CrawlerConfig, OutputConfig, SiteConfig, StoreBackend, UserAgentConfig,
};
use catalog_crawler::crawler::{crawl, CrawlEngine, TaskFailure, TaskTarget};
use catalog_crawler::site::AppStoreParser;
use catalog_crawler::storage::{RunStatus, SqliteRecordStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 4,
            max_concurrent_fetches: 2,
            max_retries: 2,
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            ..CrawlerConfig::default()
        },
        site: SiteConfig {
            list_url: format!("{}/browse", server.uri()),
            page_param: "page".to_string(),
            first_page: 1,
            end_of_pages_status: Some(422),
            transient_statuses: vec![429, 500, 502, 503, 504],
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            backend: StoreBackend::Sqlite,
            database_path: db_path.to_string_lossy().into_owned(),
            summary_path: None,
        },
    }
}

/// A list page linking to `/apps/<slug>` for every slug
fn list_html(slugs: &[&str]) -> String {
    let cards: String = slugs
        .iter()
        .map(|slug| format!(r#"<a class="ui-app-card" href="/apps/{}">{}</a>"#, slug, slug))
        .collect();
    format!("<html><body><div class=\"grid\">{}</div></body></html>", cards)
}

fn detail_html(name: &str) -> String {
    format!(
        r#"<html><body>
          <div class="ui-app-store-hero__kicker">
            <a href="/browse/marketing">Marketing</a>
            <a href="/browse/marketing/upsell">Upsell</a>
          </div>
          <h2 class="ui-app-store-hero__header__app-name">{}</h2>
          <span class="ui-app-store-hero__header__subscript">by <a href="/partners/acme">Acme Apps</a></span>
          <p class="ui-app-store-hero__description">Sell more with {}.</p>
          <span class="ui-star-rating__rating">4.5 of 5 stars</span>
          <span class="ui-review-count-summary">(10 reviews)</span>
          <div class="ui-app-pricing--format-detail">$9.99/month</div>
          <span class="reviews-summary__review-count">(6)</span>
          <span class="reviews-summary__review-count">(2)</span>
          <span class="reviews-summary__review-count">(1)</span>
          <span class="reviews-summary__review-count">(1)</span>
          <span class="reviews-summary__review-count">(0)</span>
          <h3 class="pricing-plan-card__title-header">Pro</h3>
        </body></html>"#,
        name, name
    )
}

async fn mount_list_page(server: &MockServer, page: u32, slugs: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/browse"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(slugs)))
        .mount(server)
        .await;
}

async fn mount_detail_page(server: &MockServer, slug: &str, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/apps/{}", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(name)))
        .mount(server)
        .await;
}

fn open_store(dir: &TempDir) -> Arc<SqliteRecordStore> {
    Arc::new(SqliteRecordStore::new(&dir.path().join("catalog.db")).unwrap())
}

fn engine(config: &Config, store: &Arc<SqliteRecordStore>) -> CrawlEngine {
    CrawlEngine::from_config(config, Arc::new(AppStoreParser::new()), store.clone()).unwrap()
}

#[tokio::test]
async fn test_full_crawl_until_empty_list_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list_page(&server, 1, &["oberlo", "bold-upsell"]).await;
    mount_list_page(&server, 2, &["privy"]).await;
    mount_list_page(&server, 3, &[]).await;
    Mock::given(path("/browse"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_detail_page(&server, "oberlo", "Oberlo").await;
    mount_detail_page(&server, "bold-upsell", "Bold Upsell").await;
    mount_detail_page(&server, "privy", "Privy").await;

    let config = create_test_config(&server, &dir.path().join("catalog.db"));
    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert!(report.dead_letters.is_empty(), "{:?}", report.dead_letters);
    assert!(!report.run_failed());
    assert_eq!(report.records_saved, 3);
    assert_eq!(report.records_inserted, 3);
    assert_eq!(report.list_pages, 3);
    assert_eq!(report.detail_pages, 3);
    assert_eq!(report.tasks_completed, 6);

    assert_eq!(store.count_apps().unwrap(), 3);
    let oberlo = store.get("oberlo").unwrap().unwrap();
    assert_eq!(oberlo.total_reviews, 10);
    assert_eq!(oberlo.rating_map, [0, 1, 1, 2, 6]);
    assert!(oberlo.is_paid);
    assert!(store.get("bold-upsell").unwrap().is_some());
}

#[tokio::test]
async fn test_status_based_end_of_list() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list_page(&server, 1, &["oberlo"]).await;
    Mock::given(path("/browse"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/browse"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_detail_page(&server, "oberlo", "Oberlo").await;

    let config = create_test_config(&server, &dir.path().join("catalog.db"));
    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert!(report.dead_letters.is_empty());
    assert_eq!(report.records_saved, 1);
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list_page(&server, 1, &["oberlo"]).await;
    mount_list_page(&server, 2, &[]).await;

    // First attempt gets a 503, the retry succeeds
    Mock::given(path("/apps/oberlo"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_detail_page(&server, "oberlo", "Oberlo").await;

    let config = create_test_config(&server, &dir.path().join("catalog.db"));
    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert!(report.dead_letters.is_empty());
    assert_eq!(report.retries, 1);
    assert_eq!(report.records_saved, 1);
    assert!(store.get("oberlo").unwrap().is_some());
}

#[tokio::test]
async fn test_timed_out_fetch_is_retried_then_succeeds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list_page(&server, 1, &["oberlo"]).await;
    mount_list_page(&server, 2, &[]).await;

    // First attempt outlives the request timeout, the retry answers at once
    Mock::given(path("/apps/oberlo"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_html("Oberlo"))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_detail_page(&server, "oberlo", "Oberlo").await;

    let mut config = create_test_config(&server, &dir.path().join("catalog.db"));
    config.crawler.request_timeout_secs = 1;
    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert!(report.dead_letters.is_empty(), "{:?}", report.dead_letters);
    assert_eq!(report.retries, 1);
    assert_eq!(report.records_saved, 1);
    assert!(store.get("oberlo").unwrap().is_some());
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list_page(&server, 1, &["flaky", "oberlo"]).await;
    mount_list_page(&server, 2, &[]).await;
    mount_detail_page(&server, "oberlo", "Oberlo").await;

    // max_retries = 2: one attempt plus two retries
    Mock::given(path("/apps/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir.path().join("catalog.db"));
    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert_eq!(report.records_saved, 1);
    assert_eq!(report.retries, 2);
    assert_eq!(report.dead_letters.len(), 1);

    let dead = &report.dead_letters[0];
    assert!(matches!(&dead.task.target, TaskTarget::DetailPage(url) if url.path() == "/apps/flaky"));
    assert_eq!(dead.task.retry_count, 2);
    assert_eq!(
        dead.error,
        TaskFailure::HttpStatus {
            status: 503,
            transient: true
        }
    );
    assert!(!report.run_failed());
}

#[tokio::test]
async fn test_parse_failure_is_dead_lettered_without_retry() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list_page(&server, 1, &["broken"]).await;
    mount_list_page(&server, 2, &[]).await;
    Mock::given(path("/apps/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>gone</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir.path().join("catalog.db"));
    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert_eq!(report.retries, 0);
    assert_eq!(report.records_saved, 0);
    assert_eq!(report.dead_letters.len(), 1);
    assert!(matches!(report.dead_letters[0].error, TaskFailure::Parse(_)));
}

#[tokio::test]
async fn test_permanent_http_error_is_not_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list_page(&server, 1, &["removed"]).await;
    mount_list_page(&server, 2, &[]).await;
    Mock::given(path("/apps/removed"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir.path().join("catalog.db"));
    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert_eq!(report.dead_letters.len(), 1);
    assert_eq!(
        report.dead_letters[0].error,
        TaskFailure::HttpStatus {
            status: 404,
            transient: false
        }
    );
}

#[tokio::test]
async fn test_seed_failure_fails_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(path("/browse"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir.path().join("catalog.db"));
    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert!(report.run_failed());
    assert_eq!(report.records_saved, 0);
    assert_eq!(report.tasks_completed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fetches_respect_throttle() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let slugs = ["a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8"];
    mount_list_page(&server, 1, &slugs).await;
    mount_list_page(&server, 2, &[]).await;
    for slug in slugs {
        Mock::given(path(format!("/apps/{}", slug)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(detail_html(slug))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server, &dir.path().join("catalog.db"));
    config.crawler.workers = 8;
    config.crawler.max_concurrent_fetches = 2;

    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert_eq!(report.records_saved, 8);
    assert!(report.peak_concurrent_fetches <= 2);
    assert!(report.peak_concurrent_fetches >= 1);
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list_page(&server, 1, &["oberlo", "privy"]).await;
    mount_list_page(&server, 2, &[]).await;
    mount_detail_page(&server, "oberlo", "Oberlo").await;
    mount_detail_page(&server, "privy", "Privy").await;

    let config = create_test_config(&server, &dir.path().join("catalog.db"));
    let store = open_store(&dir);

    let first = engine(&config, &store).run().await.unwrap();
    assert_eq!(first.records_inserted, 2);
    let first_seen = store.get("oberlo").unwrap().unwrap().crawled_on;

    let second = engine(&config, &store).run().await.unwrap();
    assert_eq!(second.records_inserted, 0);
    assert_eq!(second.records_updated, 2);

    assert_eq!(store.count_apps().unwrap(), 2);
    assert_eq!(store.get("oberlo").unwrap().unwrap().crawled_on, first_seen);
}

#[tokio::test]
async fn test_max_list_pages_caps_pagination() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_list_page(&server, 1, &["oberlo"]).await;
    Mock::given(path("/browse"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(&["privy"])))
        .expect(0)
        .mount(&server)
        .await;
    mount_detail_page(&server, "oberlo", "Oberlo").await;

    let mut config = create_test_config(&server, &dir.path().join("catalog.db"));
    config.crawler.max_list_pages = 1;

    let store = open_store(&dir);
    let report = engine(&config, &store).run().await.unwrap();

    assert_eq!(report.list_pages, 1);
    assert_eq!(report.records_saved, 1);
}

#[tokio::test]
async fn test_crawl_records_run_log() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");

    mount_list_page(&server, 1, &["oberlo", "missing"]).await;
    mount_list_page(&server, 2, &[]).await;
    mount_detail_page(&server, "oberlo", "Oberlo").await;
    Mock::given(path("/apps/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = create_test_config(&server, &db_path);
    let report = crawl(&config, "test_hash").await.unwrap();
    assert_eq!(report.records_saved, 1);

    let store = SqliteRecordStore::new(&db_path).unwrap();
    let runs = store.recent_runs(5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].config_hash, "test_hash");
    assert_eq!(runs[0].records_saved, 1);

    let dead = store.dead_letters_for_run(runs[0].id).unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].task_kind, "detail");
    assert!(dead[0].target.ends_with("/apps/missing"));
}
