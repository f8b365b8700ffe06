//! HTTP fetcher
//!
//! Every request holds a throttle permit from before it is sent until its body
//! has been read, and every outcome is classified into a [`FetchResult`].
//!
//! | Condition | Result |
//! |-----------|--------|
//! | 2xx, or a status the caller accepts | `Ok` |
//! | status in the transient set (429, 5xx by default) | `HttpError`, transient |
//! | any other status | `HttpError`, permanent |
//! | connect failure, timeout, body read failure | `NetworkError` |

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::throttle::Throttle;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Response with an accepted status and its full body
    Ok {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Response with a status the caller did not accept
    HttpError {
        /// HTTP status code
        status: u16,
        /// Whether the status is configured as worth retrying
        transient: bool,
    },

    /// No usable response (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        cause: String,
    },
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use catalog_crawler::config::{CrawlerConfig, UserAgentConfig};
/// use catalog_crawler::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "CatalogCrawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(crawler.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Throttled GET requests against the catalog site
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    throttle: Arc<Throttle>,
    transient_statuses: Vec<u16>,
}

impl Fetcher {
    pub fn new(client: Client, throttle: Arc<Throttle>, transient_statuses: Vec<u16>) -> Self {
        Self {
            client,
            throttle,
            transient_statuses,
        }
    }

    pub fn throttle(&self) -> &Arc<Throttle> {
        &self.throttle
    }

    /// Fetches `url` with `params` appended as query parameters
    ///
    /// Any 2xx status is accepted, plus whatever is listed in `accept`.
    pub async fn fetch(&self, url: &Url, params: &[(&str, String)], accept: &[u16]) -> FetchResult {
        let Some(_permit) = self.throttle.acquire().await else {
            return FetchResult::NetworkError {
                cause: "fetcher is shut down".to_string(),
            };
        };

        let response = match self.client.get(url.clone()).query(params).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status();
        if !status.is_success() && !accept.contains(&status.as_u16()) {
            return FetchResult::HttpError {
                status: status.as_u16(),
                transient: self.transient_statuses.contains(&status.as_u16()),
            };
        }

        match response.text().await {
            Ok(body) => FetchResult::Ok {
                status: status.as_u16(),
                body,
            },
            Err(e) => classify_error(&e),
        }
    }
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    let cause = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { cause }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn test_fetcher() -> Fetcher {
        let client = build_http_client(&create_test_config(), &CrawlerConfig::default()).unwrap();
        Fetcher::new(client, Arc::new(Throttle::new(2)), vec![429, 503])
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config(), &CrawlerConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_ok_with_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>list</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/apps", server.uri())).unwrap();
        let result = test_fetcher()
            .fetch(&url, &[("page", "3".to_string())], &[])
            .await;

        assert_eq!(
            result,
            FetchResult::Ok {
                status: 200,
                body: "<html>list</html>".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_status_classification() {
        let server = MockServer::start().await;
        Mock::given(path("/busy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/done"))
            .respond_with(ResponseTemplate::new(422).set_body_string("no more"))
            .mount(&server)
            .await;

        let fetcher = test_fetcher();
        let url = |p: &str| Url::parse(&format!("{}{}", server.uri(), p)).unwrap();

        assert_eq!(
            fetcher.fetch(&url("/busy"), &[], &[]).await,
            FetchResult::HttpError {
                status: 503,
                transient: true
            }
        );
        assert_eq!(
            fetcher.fetch(&url("/missing"), &[], &[]).await,
            FetchResult::HttpError {
                status: 404,
                transient: false
            }
        );
        assert_eq!(
            fetcher.fetch(&url("/done"), &[], &[422]).await,
            FetchResult::Ok {
                status: 422,
                body: "no more".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        // Nothing listens on port 1
        let url = Url::parse("http://127.0.0.1:1/apps").unwrap();
        let result = test_fetcher().fetch(&url, &[], &[]).await;
        assert!(matches!(result, FetchResult::NetworkError { .. }));
    }

    #[tokio::test]
    async fn test_permit_released_after_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let fetcher = test_fetcher();
        let url = Url::parse(&server.uri()).unwrap();
        fetcher.fetch(&url, &[], &[]).await;

        assert_eq!(fetcher.throttle().in_flight(), 0);
        assert_eq!(fetcher.throttle().peak(), 1);
    }
}
