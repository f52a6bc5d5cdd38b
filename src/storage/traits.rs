//! Storage traits and error types
//!
//! This module defines the trait interface for corpus backends and the
//! associated error types.

use crate::model::Course;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid course ID for storage: '{0}'")]
    InvalidCourseId(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for corpus backends
///
/// Records are keyed by `(term, course_id)`. Saving a course that already
/// exists replaces it.
pub trait Storage {
    /// Persists one course record
    ///
    /// # Returns
    ///
    /// The location the record was written to
    fn save_course(&self, course: &Course) -> StorageResult<PathBuf>;

    /// Reads a previously saved course back
    fn load_course(&self, term: &str, course_id: &str) -> StorageResult<Course>;

    /// Locations of every stored course record, sorted
    fn course_files(&self) -> StorageResult<Vec<PathBuf>>;
}
