//! Configuration module for the scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; an absent file yields the defaults for the public site.
//!
//! # Example
//!
//! ```no_run
//! use testudo_scrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("testudo.toml")).unwrap();
//! println!("Courtesy delay: {}s", config.scraper.request_delay);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, RetryConfig, RetrySettings, ScraperConfig, SiteConfig, SyllabusConfig,
};

// Re-export parser functions
pub use parser::{load_config, load_or_default, parse_config};
pub use validation::{validate, validate_department_code, validate_term};
