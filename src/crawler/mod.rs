//! Crawler module for catalog fetching and processing
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching and endpoint construction
//! - Retry with exponential backoff
//! - HTML access and field extraction
//! - Catalog parsing and overall run coordination

mod coordinator;
pub mod extract;
mod fetcher;
pub mod html;
mod parser;
mod retry;

pub use coordinator::{ReportOnDrop, ScrapeMode, Scraper};
pub use fetcher::{build_http_client, fetch_page, Endpoints};
pub use html::{HtmlNode, Page};
pub use parser::{
    parse_course_block, parse_course_listing, parse_departments, parse_sections, parse_terms,
    scrape_timestamp, CatalogParser, CourseDraft, CourseEntry, CourseRejection,
};
pub use retry::RetryPolicy;

use crate::config::Config;
use crate::ScrapeError;

/// Runs one scrape without syllabus enrichment
///
/// # Arguments
///
/// * `config` - The scraper configuration
/// * `mode` - Test, single-department, or full run
/// * `term` - Explicit term, overriding the mode's default
///
/// # Returns
///
/// * `Ok(ScrapingStats)` - Final counters of the run
/// * `Err(ScrapeError)` - Discovery failed or the department does not exist
pub async fn scrape(
    config: Config,
    mode: &ScrapeMode,
    term: Option<&str>,
) -> Result<crate::output::ScrapingStats, ScrapeError> {
    let mut scraper = Scraper::from_config(config)?;
    scraper.run(mode, term).await?;
    Ok(scraper.stats().clone())
}
