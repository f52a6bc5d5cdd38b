//! JSON file corpus
//!
//! One pretty-printed file per course at
//! `{data_dir}/{term}/{prefix}/{course_id}.json`, where `prefix` is the first
//! four characters of the course id.

use crate::model::{course_prefix, Course};
use crate::storage::{Storage, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Corpus rooted at a data directory
#[derive(Debug, Clone)]
pub struct JsonStorage {
    data_dir: PathBuf,
}

impl JsonStorage {
    /// Creates a storage rooted at `data_dir`
    ///
    /// Nothing is created on disk until the first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding every course of one term
    pub fn term_dir(&self, term: &str) -> PathBuf {
        self.data_dir.join(term)
    }

    /// Creates the term directory ahead of a term's scrape
    pub fn prepare_term(&self, term: &str) -> StorageResult<PathBuf> {
        let dir = self.term_dir(term);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Path a course record lives at
    ///
    /// Ids that could escape the corpus directory, or are too short to carry
    /// a department prefix, are refused.
    pub fn course_path(&self, term: &str, course_id: &str) -> StorageResult<PathBuf> {
        let safe = |s: &str| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };

        if course_id.chars().count() < 4 || !safe(course_id) || !safe(term) {
            return Err(StorageError::InvalidCourseId(format!("{}/{}", term, course_id)));
        }

        Ok(self
            .term_dir(term)
            .join(course_prefix(course_id))
            .join(format!("{}.json", course_id)))
    }
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> StorageResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

impl Storage for JsonStorage {
    fn save_course(&self, course: &Course) -> StorageResult<PathBuf> {
        let path = self.course_path(&course.term, &course.id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, course.to_json()?)?;
        tracing::debug!("Saved course {} to {}", course.id, path.display());
        Ok(path)
    }

    fn load_course(&self, term: &str, course_id: &str) -> StorageResult<Course> {
        let path = self.course_path(term, course_id)?;
        let text = fs::read_to_string(path)?;
        Ok(Course::from_json(&text)?)
    }

    fn course_files(&self) -> StorageResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        if self.data_dir.is_dir() {
            collect_json_files(&self.data_dir, &mut files)?;
        }
        files.sort();
        Ok(files)
    }
}
