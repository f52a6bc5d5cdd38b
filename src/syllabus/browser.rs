//! Headless Chrome syllabus extraction
//!
//! Loads a department page, expands the syllabus list of every course whose
//! badge reports at least one syllabus, and reads the semester titles from
//! the expanded container. Per-course problems are logged and recorded as
//! `None`; only failing to launch the browser or load the page is an error.

use crate::config::SyllabusConfig;
use crate::syllabus::{most_recent_semester, SyllabusMap, SyllabusSource};
use crate::ScrapeError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

static BADGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("valid regex"));

/// Syllabus source driving a headless browser
#[derive(Debug, Clone)]
pub struct BrowserSyllabi {
    config: SyllabusConfig,
}

impl BrowserSyllabi {
    pub fn new(config: SyllabusConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    /// Bounds a browser operation by the configured timeout
    async fn bounded<T, E, F>(&self, what: &str, fut: F) -> Result<T, ScrapeError>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ScrapeError::Syllabus(format!("{}: {}", what, e))),
            Err(_) => Err(ScrapeError::Syllabus(format!(
                "{}: timed out after {}ms",
                what, self.config.timeout_ms
            ))),
        }
    }

    async fn scan_department(
        &self,
        browser: &Browser,
        department_url: &str,
    ) -> Result<SyllabusMap, ScrapeError> {
        tracing::info!("Loading department page: {}", department_url);
        let page = self
            .bounded("load department page", browser.new_page(department_url))
            .await?;
        self.bounded("wait for navigation", page.wait_for_navigation())
            .await?;

        let courses = self
            .bounded("find course blocks", page.find_elements(".course"))
            .await?;
        tracing::info!("Found {} courses on page", courses.len());

        let mut results = SyllabusMap::new();
        for course in &courses {
            let Some(course_id) = self.badged_course_id(course).await else {
                continue;
            };
            let title = match self.expand_and_read(&page, &course_id, course).await {
                Ok(title) => title,
                Err(e) => {
                    tracing::warn!("Could not extract syllabus for {}: {}", course_id, e);
                    None
                }
            };
            if let Some(title) = &title {
                tracing::info!("Extracted syllabus for {}: {}", course_id, title);
            }
            results.insert(course_id, title);
        }

        tracing::info!(
            "Found {} courses with syllabi on {}",
            results.len(),
            department_url
        );
        Ok(results)
    }

    /// Course id of a block whose syllabus toggle shows a non-zero `(N)` badge
    async fn badged_course_id(&self, course: &Element) -> Option<String> {
        let id_element = course.find_element(".course-id").await.ok()?;
        let course_id = id_element.inner_text().await.ok()??.trim().to_string();

        let toggle = course.find_element("a.toggle-syllabus-link").await.ok()?;
        let toggle_text = toggle.inner_text().await.ok()??;
        let count: u32 = BADGE.captures(&toggle_text)?[1].parse().ok()?;

        (count > 0).then_some(course_id)
    }

    async fn expand_and_read(
        &self,
        page: &Page,
        course_id: &str,
        course: &Element,
    ) -> Result<Option<String>, ScrapeError> {
        let toggle = self
            .bounded(
                "find syllabus toggle",
                course.find_element("a.toggle-syllabus-link"),
            )
            .await?;
        self.bounded("expand syllabi", toggle.click()).await?;

        tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;

        let selector = format!("#{}-syllabus-container", course_id);
        let container = self
            .bounded("find syllabus container", page.find_element(selector))
            .await?;
        let text = self
            .bounded("read syllabus container", container.inner_text())
            .await?
            .unwrap_or_default();

        if text.trim().is_empty() {
            tracing::warn!("No content in syllabus container for {}", course_id);
            return Ok(None);
        }

        let title = most_recent_semester(&text);
        if title.is_none() {
            tracing::warn!(
                "No semester patterns found in syllabus content for {}: '{}'",
                course_id,
                text.trim()
            );
        }
        Ok(title)
    }
}

impl SyllabusSource for BrowserSyllabi {
    async fn extract_syllabi_for_department(
        &self,
        department_url: &str,
    ) -> Result<SyllabusMap, ScrapeError> {
        let mut builder = BrowserConfig::builder().request_timeout(self.timeout());
        if !self.config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(ScrapeError::Syllabus)?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScrapeError::Syllabus(format!("launch browser: {}", e)))?;

        // The CDP connection only makes progress while its handler is polled
        let driver = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = self.scan_department(&browser, department_url).await;

        if let Err(e) = browser.close().await {
            tracing::debug!("Error closing browser: {}", e);
        }
        driver.abort();

        result
    }
}
