//! Field extractors
//!
//! Pure functions turning raw markup fragments into typed values. None of them
//! fail: missing or malformed input collapses to an empty/zero default.

use crate::crawler::html::HtmlNode;
use crate::model::{is_gen_ed_code, Level};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static COURSE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,8}\d{3,4}[A-Z]?$").expect("valid regex"));

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

static BADGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("valid regex"));

static FOUR_LETTER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{4}\b").expect("valid regex"));

/// Parses a count such as `"1,234"`, falling back to `default`
///
/// Thousands separators are removed and the ends trimmed. Absent, empty,
/// negative, or otherwise unparseable input (including interior spaces)
/// yields `default`.
pub fn safe_int(value: Option<&str>, default: u32) -> u32 {
    let Some(value) = value else {
        return default;
    };

    let clean = value.replace(',', "");
    let clean = clean.trim();

    if clean.is_empty() {
        return default;
    }

    clean.parse().unwrap_or(default)
}

/// Trimmed text of the first descendant matching `selector`, or `""`
pub fn safe_text<N: HtmlNode>(element: &N, selector: &str) -> String {
    element
        .find_first(selector)
        .map(|e| e.inner_text())
        .unwrap_or_default()
}

/// Returns true for ids such as `CMSC131` or `ENGL101H`
pub fn validate_course_id(course_id: &str) -> bool {
    COURSE_ID.is_match(course_id.trim())
}

/// Graduate courses are numbered 500 and above
pub fn determine_course_level(course_id: &str) -> Level {
    let number = DIGITS
        .find(course_id)
        .and_then(|m| m.as_str().parse::<u64>().ok());

    match number {
        Some(n) if n >= 500 => Level::Grad,
        Some(_) => Level::Undergrad,
        None => {
            tracing::warn!("Could not determine level for {}", course_id);
            Level::Undergrad
        }
    }
}

/// Splits a comma-delimited grading field such as `"Reg, P-F, Aud"`
pub fn split_grading_methods(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collects recognized general-education codes from every element under `course`
///
/// The site does not put these codes in one consistent place, so every
/// descendant's text is scanned for standalone four-letter tokens. Tokens not
/// on the whitelist are dropped. The result is sorted and deduplicated.
pub fn extract_gen_ed<N: HtmlNode>(course: &N) -> Vec<String> {
    let mut codes = BTreeSet::new();

    for element in course.find("*") {
        let text = element.inner_text();
        for token in FOUR_LETTER_TOKEN.find_iter(&text) {
            if is_gen_ed_code(token.as_str()) {
                codes.insert(token.as_str().to_string());
            }
        }
    }

    codes.into_iter().collect()
}

/// Reads the `(N)` syllabus badge from a course block; 0 when absent
pub fn extract_syllabus_count<N: HtmlNode>(course: &N, course_id: &str) -> u32 {
    for element in course.find("span, a") {
        let text = element.inner_text();
        if let Some(caps) = BADGE.captures(&text) {
            return match caps[1].parse() {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!("Could not parse syllabus count for {}: {}", course_id, e);
                    0
                }
            };
        }
    }
    0
}
