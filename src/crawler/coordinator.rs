//! Scrape coordinator - run-level orchestration
//!
//! This module drives the parser over terms and departments, including:
//! - Resolving the department and term for each run mode
//! - Counting every course block into the run statistics
//! - Persisting accepted courses to the corpus
//! - Isolating failures so one bad department or term never ends the run

use crate::config::Config;
use crate::crawler::parser::{CatalogParser, CourseDraft};
use crate::crawler::retry::RetryPolicy;
use crate::model::{Course, Department};
use crate::output::ScrapingStats;
use crate::storage::{JsonStorage, Storage};
use crate::syllabus::{NoSyllabi, SyllabusSource};
use crate::ScrapeError;
use std::ops::{Deref, DerefMut};
use std::time::Instant;
use tracing::Instrument;

/// What a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeMode {
    /// One department, one term, stop after a few valid courses, nothing written
    Test { department: Option<String> },

    /// Every course of one department in one term
    Department(String),

    /// Every department of every listed term
    Full,
}

/// How a department's course blocks are handled
#[derive(Debug, Clone, Copy)]
struct CoursePolicy {
    /// Stop after this many valid courses
    limit: Option<u32>,

    /// Write accepted courses to the corpus
    persist: bool,
}

/// Main scrape coordinator
///
/// Owns the run statistics, the parser (and with it the syllabus cache), and
/// the corpus writer. Work is strictly sequential.
pub struct Scraper<S = NoSyllabi> {
    config: Config,
    parser: CatalogParser<S>,
    storage: JsonStorage,
    stats: ScrapingStats,
}

impl Scraper<NoSyllabi> {
    /// Creates a scraper without syllabus enrichment
    pub fn from_config(config: Config) -> Result<Self, ScrapeError> {
        Self::new(config, NoSyllabi)
    }
}

impl<S: SyllabusSource> Scraper<S> {
    /// Creates a new scraper
    ///
    /// # Arguments
    ///
    /// * `config` - The validated scraper configuration
    /// * `syllabi` - Enrichment source used when `extract-syllabi` is on
    ///
    /// # Returns
    ///
    /// * `Ok(Scraper)` - Ready to run
    /// * `Err(ScrapeError)` - The HTTP client could not be built
    pub fn new(config: Config, syllabi: S) -> Result<Self, ScrapeError> {
        let parser = CatalogParser::new(&config, syllabi)?;
        let storage = JsonStorage::new(config.scraper.data_dir.clone());

        Ok(Self {
            config,
            parser,
            storage,
            stats: ScrapingStats::new(),
        })
    }

    /// Replaces the source of course `updated` timestamps
    pub fn with_clock(mut self, clock: fn() -> String) -> Self {
        self.parser = self.parser.with_clock(clock);
        self
    }

    /// Replaces the discovery and section retry policies
    pub fn with_retry(mut self, discovery: RetryPolicy, sections: RetryPolicy) -> Self {
        self.parser = self.parser.with_retry(discovery, sections);
        self
    }

    pub fn stats(&self) -> &ScrapingStats {
        &self.stats
    }

    pub fn storage(&self) -> &JsonStorage {
        &self.storage
    }

    /// Wraps the scraper so `report` sees the final statistics when the
    /// wrapper is dropped, including while a panic unwinds
    pub fn report_on_drop<F>(self, report: F) -> ReportOnDrop<S, F>
    where
        F: FnMut(&ScrapingStats),
    {
        ReportOnDrop {
            scraper: self,
            report,
        }
    }

    /// Runs one mode to completion
    ///
    /// `term` overrides the term selection of every mode.
    pub async fn run(&mut self, mode: &ScrapeMode, term: Option<&str>) -> Result<(), ScrapeError> {
        match mode {
            ScrapeMode::Test { department } => self.scrape_test(department.as_deref(), term).await,
            ScrapeMode::Department(id) => self.scrape_department(id, term).await,
            ScrapeMode::Full => self.scrape_full(term).await,
        }
    }

    /// Scrapes a few courses of one department without writing anything
    ///
    /// Falls back to the configured test department and default term.
    pub async fn scrape_test(
        &mut self,
        department_id: Option<&str>,
        term: Option<&str>,
    ) -> Result<(), ScrapeError> {
        let department_id = department_id
            .unwrap_or(&self.config.scraper.test_department)
            .to_string();
        let term = term.unwrap_or(&self.config.site.default_term).to_string();

        tracing::info!("Test mode: only scraping department {}", department_id);
        tracing::info!("Testing with term {}", term);

        let department = self.find_department(&department_id).await?;
        tracing::info!("Testing department: {} ({})", department.name, department.id);

        let policy = CoursePolicy {
            limit: Some(self.config.scraper.test_max_courses),
            persist: false,
        };
        self.process_department(&department, &term, policy).await;
        Ok(())
    }

    /// Scrapes and persists every course of one department
    pub async fn scrape_department(
        &mut self,
        department_id: &str,
        term: Option<&str>,
    ) -> Result<(), ScrapeError> {
        let term = term.unwrap_or(&self.config.site.default_term).to_string();

        let department = self.find_department(department_id).await?;
        tracing::info!(
            "Scraping department {} ({}) for term {}",
            department.name,
            department.id,
            term
        );

        let policy = CoursePolicy {
            limit: None,
            persist: true,
        };
        self.process_department(&department, &term, policy).await;
        Ok(())
    }

    /// Scrapes every department of every term
    ///
    /// Term and department discovery failures end the run; anything below
    /// that is logged and skipped.
    pub async fn scrape_full(&mut self, term: Option<&str>) -> Result<(), ScrapeError> {
        let terms = self.parser.get_terms(term).await?;
        let departments = self.parser.get_departments().await?;
        tracing::info!("Found {} departments to process", departments.len());

        for term in &terms {
            let span = tracing::info_span!("term", term = %term);
            self.scrape_term(&departments, term).instrument(span).await;
        }

        Ok(())
    }

    async fn scrape_term(&mut self, departments: &[Department], term: &str) {
        tracing::info!("Starting scrape for term {}", term);
        let started = Instant::now();

        if let Err(e) = self.storage.prepare_term(term) {
            tracing::error!("Error processing term {}: {}", term, e);
            return;
        }

        let policy = CoursePolicy {
            limit: None,
            persist: true,
        };
        let total = departments.len();
        for (i, department) in departments.iter().enumerate() {
            tracing::info!(
                "Processing department {}/{}: {} - {}",
                i + 1,
                total,
                department.id,
                department.name
            );
            self.process_department(department, term, policy).await;
        }

        tracing::info!(
            "Completed term {} in {:.1}s",
            term,
            started.elapsed().as_secs_f64()
        );
    }

    async fn find_department(&self, department_id: &str) -> Result<Department, ScrapeError> {
        self.parser
            .get_departments()
            .await?
            .into_iter()
            .find(|d| d.id == department_id)
            .ok_or_else(|| ScrapeError::UnknownDepartment(department_id.to_string()))
    }

    /// Processes one department's listing
    ///
    /// Every block counts toward `total_courses`. The department counts as
    /// processed even when its listing could not be fetched.
    async fn process_department(&mut self, department: &Department, term: &str, policy: CoursePolicy) {
        let span = tracing::info_span!("department", id = %department.id);
        self.process_courses(department, term, policy)
            .instrument(span)
            .await;
        self.stats.departments_processed += 1;
    }

    async fn process_courses(&mut self, department: &Department, term: &str, policy: CoursePolicy) {
        let started = Instant::now();

        let entries = match self.parser.list_courses(department, term).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Error processing department {}: {}", department.id, e);
                return;
            }
        };

        let mut accepted = 0u32;
        let mut succeeded = 0u32;
        let mut failed = 0u32;

        for entry in entries {
            self.stats.total_courses += 1;

            let draft: CourseDraft = match entry {
                Ok(draft) => draft,
                Err(rejection) => {
                    tracing::warn!("Skipping course: {}", rejection);
                    self.stats.failed_courses += 1;
                    failed += 1;
                    continue;
                }
            };
            accepted += 1;

            let course = self.parser.complete_course(draft, department, term).await;

            let ok = if policy.persist {
                self.save_course(&course)
            } else {
                tracing::info!("Found course: {} - {}", course.id, course.title);
                true
            };

            if ok {
                self.stats.successful_courses += 1;
                succeeded += 1;
            } else {
                self.stats.failed_courses += 1;
                failed += 1;
            }

            if let Some(limit) = policy.limit {
                if accepted >= limit {
                    tracing::info!("Test mode: stopping after {} courses", limit);
                    break;
                }
            }
        }

        tracing::info!(
            "Completed {}: {} courses, {} failed in {:.1}s",
            department.id,
            succeeded,
            failed,
            started.elapsed().as_secs_f64()
        );
    }

    /// Writes one course; failures are logged and reported as `false`
    fn save_course(&self, course: &Course) -> bool {
        match self.storage.save_course(course) {
            Ok(path) => {
                tracing::debug!("Wrote {}", path.display());
                true
            }
            Err(e) => {
                tracing::error!("Error writing course {}: {}", course.id, e);
                false
            }
        }
    }
}

/// A [`Scraper`] that reports its statistics exactly once, on drop
pub struct ReportOnDrop<S, F: FnMut(&ScrapingStats)> {
    scraper: Scraper<S>,
    report: F,
}

impl<S, F: FnMut(&ScrapingStats)> Deref for ReportOnDrop<S, F> {
    type Target = Scraper<S>;

    fn deref(&self) -> &Scraper<S> {
        &self.scraper
    }
}

impl<S, F: FnMut(&ScrapingStats)> DerefMut for ReportOnDrop<S, F> {
    fn deref_mut(&mut self) -> &mut Scraper<S> {
        &mut self.scraper
    }
}

impl<S, F: FnMut(&ScrapingStats)> Drop for ReportOnDrop<S, F> {
    fn drop(&mut self) {
        (self.report)(&self.scraper.stats);
    }
}
