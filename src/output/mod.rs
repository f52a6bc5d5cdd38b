//! Output module for run summaries
//!
//! This module handles:
//! - Tallying course outcomes during a scrape
//! - Printing the end-of-run summary
//! - Summarizing the corpus already on disk

pub mod stats;

pub use stats::{
    load_statistics, print_corpus_statistics, print_statistics, CorpusStatistics, ScrapingStats,
};
