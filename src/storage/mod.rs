//! Storage module for persisting scraped courses
//!
//! This module handles the on-disk course corpus, including:
//! - Writing one JSON record per course, partitioned by term and prefix
//! - Reading records back, accepting legacy hyphenated keys
//! - Walking the corpus for statistics

mod json;
mod traits;

pub use json::JsonStorage;
pub use traits::{Storage, StorageError, StorageResult};
