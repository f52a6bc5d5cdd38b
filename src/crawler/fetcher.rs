//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Building the three catalog endpoint URLs
//! - GET requests returning page bodies, with HTTP error statuses surfaced
//!   as errors so the retry policy can see them

use crate::config::SiteConfig;
use crate::ScrapeError;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The remote site configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use testudo_scrape::config::SiteConfig;
/// use testudo_scrape::crawler::build_http_client;
///
/// let client = build_http_client(&SiteConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &SiteConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// URLs of the three catalog pages
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Landing page listing terms and departments
    pub fn landing(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// Course listing for one department in one term
    pub fn department(&self, term: &str, department_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, term, department_id)
    }

    /// Section listing for one course in one term
    pub fn sections(&self, term: &str, course_id: &str) -> String {
        format!("{}/{}/sections?courseIds={}", self.base_url, term, course_id)
    }
}

/// Fetches a page body
///
/// # Error Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | `Ok(body)` |
/// | Any other status | `ScrapeError::Status` |
/// | Timeout / connection failure / body read failure | `ScrapeError::Http` |
///
/// All of these are treated as transient by the caller's retry policy.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, ScrapeError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            tracing::debug!("Request timeout for {}", url);
        } else if e.is_connect() {
            tracing::debug!("Connection failed for {}", url);
        }
        ScrapeError::Http {
            url: url.to_string(),
            source: e,
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            url: url.to_string(),
            status,
        });
    }

    response.text().await.map_err(|e| ScrapeError::Http {
        url: url.to_string(),
        source: e,
    })
}
