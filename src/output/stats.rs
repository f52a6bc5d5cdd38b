//! Run and corpus statistics
//!
//! [`ScrapingStats`] is the live tally of one scrape. [`CorpusStatistics`]
//! summarizes whatever is already on disk.

use crate::model::{Course, Level};
use crate::storage::{Storage, StorageResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::time::{Duration, Instant};

/// Counters for one scrape run
#[derive(Debug, Clone)]
pub struct ScrapingStats {
    /// Wall-clock start, for the summary header
    pub started_at: DateTime<Utc>,

    start: Instant,

    /// Course blocks encountered, valid or not
    pub total_courses: u64,

    /// Courses parsed and persisted (or found, in test mode)
    pub successful_courses: u64,

    /// Blocks rejected by validation plus courses that failed to persist
    pub failed_courses: u64,

    /// Departments attempted, including those whose listing failed
    pub departments_processed: u64,
}

impl ScrapingStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            start: Instant::now(),
            total_courses: 0,
            successful_courses: 0,
            failed_courses: 0,
            departments_processed: 0,
        }
    }

    /// Percentage of course blocks that produced a course, 0 when none were seen
    pub fn success_rate(&self) -> f64 {
        if self.total_courses == 0 {
            return 0.0;
        }
        self.successful_courses as f64 / self.total_courses as f64 * 100.0
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for ScrapingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints run statistics to stdout
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ScrapingStats) {
    println!("=== Scraping Statistics ===\n");

    println!("Started: {}", stats.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Elapsed: {:.1}s", stats.elapsed().as_secs_f64());
    println!();

    println!("Overview:");
    println!("  Departments processed: {}", stats.departments_processed);
    println!("  Total courses: {}", stats.total_courses);
    println!("  Successful: {}", stats.successful_courses);
    println!("  Failed: {}", stats.failed_courses);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} courses)",
        stats.success_rate(),
        stats.successful_courses,
        stats.total_courses
    );
}

/// Summary of the course corpus already on disk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusStatistics {
    /// Number of readable course records
    pub total_courses: u64,

    /// Courses per term
    pub courses_by_term: BTreeMap<String, u64>,

    /// Undergraduate and graduate course counts
    pub undergrad_courses: u64,
    pub grad_courses: u64,

    /// Sections across all courses
    pub total_sections: u64,

    /// Courses carrying a syllabus title
    pub courses_with_syllabus: u64,

    /// Files that could not be read as a course
    pub unreadable_files: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The corpus to walk
///
/// # Returns
///
/// * `Ok(CorpusStatistics)` - Counts over every readable record
/// * `Err(StorageError)` - The corpus directory could not be listed
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CorpusStatistics> {
    let mut stats = CorpusStatistics::default();

    for path in storage.course_files()? {
        let course = match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| Course::from_json(&text).map_err(|e| e.to_string()))
        {
            Ok(course) => course,
            Err(e) => {
                tracing::warn!("Skipping unreadable record {}: {}", path.display(), e);
                stats.unreadable_files += 1;
                continue;
            }
        };

        stats.total_courses += 1;
        *stats.courses_by_term.entry(course.term.clone()).or_insert(0) += 1;
        match course.level {
            Level::Undergrad => stats.undergrad_courses += 1,
            Level::Grad => stats.grad_courses += 1,
        }
        stats.total_sections += course.sections.len() as u64;
        if course.most_recent_syllabus.is_some() {
            stats.courses_with_syllabus += 1;
        }
    }

    Ok(stats)
}

/// Prints corpus statistics to stdout
pub fn print_corpus_statistics(stats: &CorpusStatistics) {
    println!("=== Corpus Statistics ===\n");

    println!("Overview:");
    println!("  Total courses: {}", stats.total_courses);
    println!("  Undergraduate: {}", stats.undergrad_courses);
    println!("  Graduate: {}", stats.grad_courses);
    println!("  Total sections: {}", stats.total_sections);
    println!("  With syllabus: {}", stats.courses_with_syllabus);
    println!();

    if !stats.courses_by_term.is_empty() {
        println!("Courses by Term:");
        for (term, count) in &stats.courses_by_term {
            println!("  {}: {}", term, count);
        }
        println!();
    }

    if stats.unreadable_files > 0 {
        println!("Unreadable files: {}", stats.unreadable_files);
    }
}
