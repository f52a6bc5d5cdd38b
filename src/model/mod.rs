//! Course catalog records
//!
//! These types are both the parser's output and the on-disk corpus contract:
//! one [`Course`] serializes to one JSON file. Deserialization accepts the
//! hyphenated keys (`open-seats`, `grading-method`, `gen-ed`) written by
//! older producers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// General-education requirement codes recognized in course markup
pub const GEN_ED_CODES: [&str; 13] = [
    "DSHS", "DSHU", "DSNL", "DSNS", "DSSP", "DVCC", "DVUP", "FSAR", "FSAW", "FSMA", "FSOC",
    "FSPW", "SCIS",
];

/// Returns true if `code` is a known general-education code
pub fn is_gen_ed_code(code: &str) -> bool {
    GEN_ED_CODES.contains(&code)
}

/// An academic department, e.g. `CMSC` / "Computer Science"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    /// Short code used in listing URLs
    pub id: String,

    /// Display name stored on each course
    pub name: String,
}

impl Department {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Course level, derived from the numeric part of the course id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Undergrad,
    Grad,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undergrad => f.write_str("Undergrad"),
            Self::Grad => f.write_str("Grad"),
        }
    }
}

/// One scheduled offering of a course
///
/// Seat counts are copied as published. The site occasionally reports more
/// open seats than total seats; that is kept, not corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub instructors: Vec<String>,
    pub seats: u32,
    #[serde(alias = "open-seats")]
    pub open_seats: u32,
    pub waitlist: u32,
    pub days: String,
    pub start: String,
    pub end: String,
    pub building: String,
    pub room: String,
}

/// One catalog entry for a specific term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub credits: String,
    pub description: String,
    pub level: Level,
    #[serde(alias = "grading-method", default)]
    pub grading_method: Vec<String>,
    #[serde(alias = "gen-ed", default)]
    pub gen_ed: Vec<String>,
    pub sections: Vec<Section>,
    pub term: String,
    pub department: String,
    #[serde(default)]
    pub syllabus_count: u32,
    #[serde(default)]
    pub most_recent_syllabus: Option<String>,
    pub updated: String,
}

impl Course {
    /// Department prefix used to partition the corpus (first four characters of the id)
    pub fn prefix(&self) -> &str {
        course_prefix(&self.id)
    }

    /// Pretty JSON with two-space indentation; non-ASCII text is kept as-is
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// First four characters of a course id, or the whole id when shorter
pub fn course_prefix(course_id: &str) -> &str {
    match course_id.char_indices().nth(4) {
        Some((idx, _)) => &course_id[..idx],
        None => course_id,
    }
}
