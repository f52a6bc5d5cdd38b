//! Schedule of Classes parser
//!
//! [`CatalogParser`] walks the four fetch stages of a scrape:
//! - terms and departments from the landing page
//! - course blocks from a department listing
//! - sections from the per-course section listing
//!
//! Every network call goes through a [`RetryPolicy`]. Markup is decoded by
//! the synchronous `parse_*` functions, which never fail: structural problems
//! degrade to empty fields or skipped records.

use crate::config::{validate, Config};
use crate::crawler::extract::{
    determine_course_level, extract_gen_ed, extract_syllabus_count, safe_int, safe_text,
    split_grading_methods, validate_course_id,
};
use crate::crawler::fetcher::{build_http_client, fetch_page, Endpoints};
use crate::crawler::html::{HtmlNode, Page};
use crate::crawler::retry::RetryPolicy;
use crate::model::{Course, Department, Section};
use crate::syllabus::{NoSyllabi, SyllabusMap, SyllabusSource};
use crate::ScrapeError;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Why a course block was dropped before any further work was done on it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CourseRejection {
    #[error("Invalid course ID: '{0}'")]
    InvalidId(String),

    #[error("No title found for {0}")]
    MissingTitle(String),
}

/// Fields read from one course block, before sections are fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDraft {
    pub id: String,
    pub title: String,
    pub credits: String,
    pub description: String,
    pub grading_method: Vec<String>,
    pub gen_ed: Vec<String>,
    pub syllabus_count: u32,
}

/// One course block of a listing: a usable draft or the reason it was dropped
pub type CourseEntry = Result<CourseDraft, CourseRejection>;

/// Timestamp stamped on every parsed course
pub fn scrape_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parser for Schedule of Classes pages
pub struct CatalogParser<S = NoSyllabi> {
    client: Client,
    endpoints: Endpoints,
    discovery_retry: RetryPolicy,
    section_retry: RetryPolicy,
    request_delay: Duration,
    extract_syllabi: bool,
    syllabi: S,
    /// Syllabus titles per department id, filled on first use
    syllabus_cache: HashMap<String, SyllabusMap>,
    clock: fn() -> String,
}

impl CatalogParser<NoSyllabi> {
    /// Creates a parser without syllabus enrichment
    pub fn from_config(config: &Config) -> Result<Self, ScrapeError> {
        Self::new(config, NoSyllabi)
    }
}

impl<S: SyllabusSource> CatalogParser<S> {
    /// Creates a parser
    ///
    /// # Arguments
    ///
    /// * `config` - Scraper configuration (site, retry, delay, syllabus flag)
    /// * `syllabi` - Enrichment source consulted when `extract-syllabi` is on
    ///
    /// # Returns
    ///
    /// * `Err(ScrapeError::Config)` - The configuration is invalid
    /// * `Err(ScrapeError::Reqwest)` - The HTTP client could not be built
    pub fn new(config: &Config, syllabi: S) -> Result<Self, ScrapeError> {
        validate(config)?;

        Ok(Self {
            client: build_http_client(&config.site)?,
            endpoints: Endpoints::new(&config.site.base_url),
            discovery_retry: config.retry.discovery.policy(),
            section_retry: config.retry.sections.policy(),
            request_delay: config.scraper.request_delay(),
            extract_syllabi: config.scraper.extract_syllabi,
            syllabi,
            syllabus_cache: HashMap::new(),
            clock: scrape_timestamp,
        })
    }

    /// Replaces the source of `updated` timestamps
    pub fn with_clock(mut self, clock: fn() -> String) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces both retry policies
    pub fn with_retry(mut self, discovery: RetryPolicy, sections: RetryPolicy) -> Self {
        self.discovery_retry = discovery;
        self.section_retry = sections;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn fetch(&self, policy: &RetryPolicy, operation: &str, url: &str) -> Result<String, ScrapeError> {
        policy.run(operation, || fetch_page(&self.client, url)).await
    }

    /// Available terms
    ///
    /// An explicit `term` is returned as-is without touching the network.
    pub async fn get_terms(&self, term: Option<&str>) -> Result<Vec<String>, ScrapeError> {
        if let Some(term) = term {
            return Ok(vec![term.to_string()]);
        }

        let url = self.endpoints.landing();
        tracing::info!("Fetching terms from {}", url);
        let html = self.fetch(&self.discovery_retry, "get_terms", &url).await?;

        let terms = parse_terms(&html);
        tracing::info!("Found {} terms", terms.len());
        Ok(terms)
    }

    /// All departments listed on the landing page
    pub async fn get_departments(&self) -> Result<Vec<Department>, ScrapeError> {
        let url = self.endpoints.landing();
        tracing::info!("Fetching departments from {}", url);
        let html = self
            .fetch(&self.discovery_retry, "get_departments", &url)
            .await?;

        let departments = parse_departments(&html);
        tracing::info!("Found {} departments", departments.len());
        Ok(departments)
    }

    /// Course blocks of one department listing, in page order
    ///
    /// Only the listing page is fetched here; call [`Self::complete_course`]
    /// on each accepted draft to fetch its sections.
    pub async fn list_courses(
        &self,
        department: &Department,
        term: &str,
    ) -> Result<Vec<CourseEntry>, ScrapeError> {
        let url = self.endpoints.department(term, &department.id);
        tracing::info!("Fetching courses from {}", url);
        let html = self.fetch(&self.discovery_retry, "get_courses", &url).await?;

        let entries = parse_course_listing(&html);
        tracing::info!("Found {} courses for {}", entries.len(), department.id);
        Ok(entries)
    }

    /// Turns a draft into a full course: syllabus lookup, sections, timestamp
    pub async fn complete_course(
        &mut self,
        draft: CourseDraft,
        department: &Department,
        term: &str,
    ) -> Course {
        let most_recent_syllabus = if draft.syllabus_count > 0 {
            self.most_recent_syllabus(department, term, &draft.id).await
        } else {
            None
        };

        let sections = self.get_sections(&draft.id, term).await;

        Course {
            level: determine_course_level(&draft.id),
            id: draft.id,
            title: draft.title,
            credits: draft.credits,
            description: draft.description,
            grading_method: draft.grading_method,
            gen_ed: draft.gen_ed,
            sections,
            term: term.to_string(),
            department: department.name.clone(),
            syllabus_count: draft.syllabus_count,
            most_recent_syllabus,
            updated: (self.clock)(),
        }
    }

    /// Sections of one course; a failed fetch yields no sections
    ///
    /// Sleeps for the courtesy delay afterwards, whether or not the fetch
    /// succeeded.
    pub async fn get_sections(&self, course_id: &str, term: &str) -> Vec<Section> {
        let url = self.endpoints.sections(term, course_id);
        tracing::debug!("Fetching sections for {} from {}", course_id, url);

        let sections = match self.fetch(&self.section_retry, "get_sections", &url).await {
            Ok(html) => parse_sections(&html, course_id),
            Err(e) => {
                tracing::error!("Error getting sections for {}: {}", course_id, e);
                Vec::new()
            }
        };

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        tracing::debug!("Parsed {} sections for {}", sections.len(), course_id);
        sections
    }

    /// Looks up a course's most recent syllabus, loading the department once
    async fn most_recent_syllabus(
        &mut self,
        department: &Department,
        term: &str,
        course_id: &str,
    ) -> Option<String> {
        if !self.extract_syllabi {
            tracing::debug!("Course {} has syllabi available for extraction", course_id);
            return None;
        }

        if !self.syllabus_cache.contains_key(&department.id) {
            let url = self.endpoints.department(term, &department.id);
            let map = match self.syllabi.extract_syllabi_for_department(&url).await {
                Ok(map) => map,
                Err(e) => {
                    tracing::error!("Syllabus extraction failed for {}: {}", department.id, e);
                    SyllabusMap::new()
                }
            };
            self.syllabus_cache.insert(department.id.clone(), map);
        }

        self.syllabus_cache
            .get(&department.id)
            .and_then(|map| map.get(course_id))
            .cloned()
            .flatten()
    }
}

/// Term codes from the landing page's term selector
pub fn parse_terms(html: &str) -> Vec<String> {
    let page = Page::parse(html);
    page.root()
        .find("#term-id-input option")
        .iter()
        .filter_map(|option| option.attribute("value"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Departments from the landing page; blocks missing a code or name are skipped
pub fn parse_departments(html: &str) -> Vec<Department> {
    let page = Page::parse(html);
    let mut departments = Vec::new();

    for block in page.root().find(".course-prefix") {
        let id = safe_text(&block, ".prefix-abbrev");
        let name = safe_text(&block, ".prefix-name");

        if id.is_empty() || name.is_empty() {
            tracing::warn!(
                "Could not parse department from block (id: '{}', name: '{}')",
                id,
                name
            );
            continue;
        }

        departments.push(Department::new(id, name));
    }

    departments
}

/// All course blocks of a department listing
pub fn parse_course_listing(html: &str) -> Vec<CourseEntry> {
    let page = Page::parse(html);
    page.root()
        .find(".course")
        .iter()
        .map(parse_course_block)
        .collect()
}

/// Reads one course block
///
/// The id and title are checked first; a block failing either is rejected
/// before any other field is read.
pub fn parse_course_block<N: HtmlNode>(block: &N) -> CourseEntry {
    let id = safe_text(block, ".course-id");
    if !validate_course_id(&id) {
        return Err(CourseRejection::InvalidId(id));
    }

    let title = safe_text(block, ".course-title");
    if title.is_empty() {
        return Err(CourseRejection::MissingTitle(id));
    }

    let credits = match safe_text(block, ".course-min-credits") {
        credits if credits.is_empty() => "Unknown".to_string(),
        credits => credits,
    };

    let description = match safe_text(block, ".approved-course-text") {
        text if text.is_empty() => safe_text(block, ".course-text"),
        text => text,
    };

    Ok(CourseDraft {
        grading_method: split_grading_methods(&safe_text(block, ".grading-method")),
        gen_ed: extract_gen_ed(block),
        syllabus_count: extract_syllabus_count(block, &id),
        id,
        title,
        credits,
        description,
    })
}

/// Sections from a section listing page; sections without an id are skipped
pub fn parse_sections(html: &str, course_id: &str) -> Vec<Section> {
    let page = Page::parse(html);
    let mut sections = Vec::new();

    for block in page.root().find(".section") {
        let id = safe_text(&block, ".section-id");
        if id.is_empty() {
            tracing::warn!("Section with no ID found for {}", course_id);
            continue;
        }

        let instructors = block
            .find(".section-instructor")
            .iter()
            .map(|e| e.inner_text())
            .filter(|name| !name.is_empty())
            .collect();

        let count = |selector: &str| safe_int(Some(safe_text(&block, selector).as_str()), 0);

        sections.push(Section {
            id,
            instructors,
            seats: count(".total-seats-count"),
            open_seats: count(".open-seats-count"),
            waitlist: count(".waitlist-count"),
            days: safe_text(&block, ".section-days"),
            start: safe_text(&block, ".class-start-time")
                .trim_matches(|c| c == ' ' || c == '-')
                .to_string(),
            end: safe_text(&block, ".class-end-time"),
            building: safe_text(&block, ".building-code"),
            room: safe_text(&block, ".class-room"),
        });
    }

    sections
}
