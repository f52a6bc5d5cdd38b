use crate::config::types::{
    Config, RetryConfig, RetrySettings, ScraperConfig, SiteConfig, SyllabusConfig,
};
use crate::ConfigError;
use url::Url;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Longest configurable wait, one day
const MAX_SECONDS: f64 = 86_400.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_log_level(&config.log_level)?;
    validate_site_config(&config.site)?;
    validate_scraper_config(&config.scraper)?;
    validate_retry_config(&config.retry)?;
    validate_syllabus_config(&config.syllabus)?;
    Ok(())
}

fn validate_log_level(level: &str) -> Result<(), ConfigError> {
    if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::Validation(format!(
            "log-level must be one of {}, got '{}'",
            LOG_LEVELS.join(", "),
            level
        )));
    }
    Ok(())
}

/// Validates remote site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    validate_term(&config.default_term)?;

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates scrape behavior configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    validate_seconds("request-delay", config.request_delay)?;

    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    if config.test_max_courses < 1 {
        return Err(ConfigError::Validation(format!(
            "test-max-courses must be >= 1, got {}",
            config.test_max_courses
        )));
    }

    validate_department_code(&config.test_department)?;

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    validate_retry_settings("retry.discovery", &config.discovery)?;
    validate_retry_settings("retry.sections", &config.sections)?;
    Ok(())
}

fn validate_retry_settings(name: &str, settings: &RetrySettings) -> Result<(), ConfigError> {
    if settings.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "{}.max-retries must be >= 1, got {}",
            name, settings.max_retries
        )));
    }
    validate_seconds(&format!("{}.base-delay", name), settings.base_delay)
}

fn validate_syllabus_config(config: &SyllabusConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "syllabus.timeout-ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }
    Ok(())
}

/// Durations are written as seconds, between zero and [`MAX_SECONDS`]
fn validate_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=MAX_SECONDS).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 0 and {} seconds, got {}",
            name, MAX_SECONDS, value
        )));
    }
    Ok(())
}

/// Validates a six-digit term code such as `202508`
pub fn validate_term(term: &str) -> Result<(), ConfigError> {
    if term.len() != 6 || !term.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "term must be a 6-digit code like 202508, got '{}'",
            term
        )));
    }
    Ok(())
}

/// Validates an uppercase department code such as `CMSC`
pub fn validate_department_code(code: &str) -> Result<(), ConfigError> {
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "department must be an uppercase code like CMSC, got '{}'",
            code
        )));
    }
    Ok(())
}
