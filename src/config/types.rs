use crate::crawler::RetryPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the scraper
///
/// Every section is optional; a missing file section falls back to the
/// defaults that match the public Schedule of Classes site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default tracing level when no verbosity flag is given
    #[serde(rename = "log-level")]
    pub log_level: String,

    pub site: SiteConfig,
    pub scraper: ScraperConfig,
    pub retry: RetryConfig,
    pub syllabus: SyllabusConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            site: SiteConfig::default(),
            scraper: ScraperConfig::default(),
            retry: RetryConfig::default(),
            syllabus: SyllabusConfig::default(),
        }
    }
}

/// Remote catalog site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root of the Schedule of Classes, without trailing slash
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Term used by test and single-department runs when none is given
    #[serde(rename = "default-term")]
    pub default_term: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.testudo.umd.edu/soc".to_string(),
            user_agent: "testudo-scrape (+https://github.com/dwillis/testudo)".to_string(),
            default_term: "202508".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Scrape behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Courtesy delay after every section fetch (seconds)
    #[serde(rename = "request-delay")]
    pub request_delay: f64,

    /// Root of the JSON corpus
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,

    /// Number of valid courses after which a test run stops
    #[serde(rename = "test-max-courses")]
    pub test_max_courses: u32,

    /// Department scraped by a test run when none is given
    #[serde(rename = "test-department")]
    pub test_department: String,

    /// Enables headless-browser syllabus enrichment
    #[serde(rename = "extract-syllabi")]
    pub extract_syllabi: bool,
}

impl ScraperConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.request_delay)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_delay: 1.0,
            data_dir: PathBuf::from("data"),
            test_max_courses: 3,
            test_department: "AAAS".to_string(),
            extract_syllabi: false,
        }
    }
}

/// Retry parameters per call site
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Term, department, and course listing fetches
    pub discovery: RetrySettings,

    /// Section fetches (cheaper, far more frequent)
    pub sections: RetrySettings,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            discovery: RetrySettings {
                max_retries: 3,
                base_delay: 1.0,
            },
            sections: RetrySettings {
                max_retries: 2,
                base_delay: 0.5,
            },
        }
    }
}

/// A single retry policy as written in the config file
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetrySettings {
    /// Total attempts before giving up
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Backoff base (seconds)
    #[serde(rename = "base-delay")]
    pub base_delay: f64,
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_secs_f64(self.base_delay))
    }
}

/// Headless-browser syllabus extraction settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyllabusConfig {
    pub headless: bool,

    /// Timeout for page loads and element lookups (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Wait after expanding a syllabus list (milliseconds)
    #[serde(rename = "settle-ms")]
    pub settle_ms: u64,
}

impl Default for SyllabusConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_ms: 10_000,
            settle_ms: 2_000,
        }
    }
}
