//! Most-recent-syllabus enrichment
//!
//! Syllabus titles are only visible after expanding each course's syllabus
//! list in a real browser, so enrichment sits behind [`SyllabusSource`]:
//! - [`NoSyllabi`] - the default, never touches the network
//! - `BrowserSyllabi` - headless Chrome, behind the `browser` feature
//!
//! The parser calls a source at most once per department and caches the
//! result. A source error only empties that department's cache.

#[cfg(feature = "browser")]
mod browser;

#[cfg(feature = "browser")]
pub use browser::BrowserSyllabi;

use crate::ScrapeError;
use regex::Regex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::LazyLock;

/// Course id to most recent syllabus title (`None` when extraction failed)
pub type SyllabusMap = HashMap<String, Option<String>>;

/// Capability for looking up syllabus titles for a whole department page
pub trait SyllabusSource {
    /// Extracts the most recent syllabus title of every course on the page
    ///
    /// # Arguments
    ///
    /// * `department_url` - Course listing page of one department and term
    ///
    /// # Returns
    ///
    /// * `Ok(SyllabusMap)` - Entries for courses with a non-zero syllabus badge
    /// * `Err(ScrapeError)` - The page could not be loaded at all
    fn extract_syllabi_for_department(
        &self,
        department_url: &str,
    ) -> impl Future<Output = Result<SyllabusMap, ScrapeError>>;
}

/// Source used when syllabus extraction is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSyllabi;

impl SyllabusSource for NoSyllabi {
    async fn extract_syllabi_for_department(
        &self,
        _department_url: &str,
    ) -> Result<SyllabusMap, ScrapeError> {
        Ok(SyllabusMap::new())
    }
}

/// Academic seasons, in the order used to break ties within a year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Season {
    Spring = 1,
    Summer = 2,
    Fall = 3,
    Winter = 4,
}

impl Season {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spring" => Some(Self::Spring),
            "summer" => Some(Self::Summer),
            "fall" => Some(Self::Fall),
            "winter" => Some(Self::Winter),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Fall => "Fall",
            Self::Winter => "Winter",
        }
    }
}

static SEASON_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(fall|spring|summer|winter)\s+(\d{4})\b").expect("valid regex")
});

static YEAR_SEASON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{4})\s+(fall|spring|summer|winter)\b").expect("valid regex")
});

/// Finds semester mentions such as `Fall 2023` or `2024 spring`
///
/// Titles are normalized to `Season Year` and deduplicated, then ordered most
/// recent first: year descending, then Spring, Summer, Fall, Winter.
pub fn parse_semester_patterns(text: &str) -> Vec<String> {
    let mut found: Vec<(u32, Season)> = Vec::new();

    let season_first = SEASON_YEAR
        .captures_iter(text)
        .map(|caps| (caps[2].to_string(), caps[1].to_string()));
    let year_first = YEAR_SEASON
        .captures_iter(text)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()));

    for (year, season) in season_first.chain(year_first) {
        let (Ok(year), Some(season)) = (year.parse::<u32>(), Season::parse(&season)) else {
            continue;
        };
        if !found.contains(&(year, season)) {
            found.push((year, season));
        }
    }

    found.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    found
        .into_iter()
        .map(|(year, season)| format!("{} {}", season.name(), year))
        .collect()
}

/// Most recent semester mentioned in `text`
pub fn most_recent_semester(text: &str) -> Option<String> {
    parse_semester_patterns(text).into_iter().next()
}
