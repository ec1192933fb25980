//! Class-index to disease-name mapping.
//!
//! The label resource is a plain text file with one class name per line.
//! Line order is the class-index order of the classifier's score vector, so
//! the table is never sorted or deduplicated.

use std::fs;
use std::path::Path;

use log::info;

use crate::classifier::ClassifierError;

/// Ordered, immutable list of human-readable class names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Reads a label file, one label per line, trimming surrounding whitespace.
    ///
    /// Trailing blank lines are ignored. A blank line between labels is rejected
    /// because it would silently shift every later class index. A file with no
    /// labels at all is rejected as well.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ClassifierError::ArtifactLoadError(format!(
                "Failed to read label file {}: {}",
                path.display(),
                e
            ))
        })?;

        let table = Self::parse(&contents)?;
        info!("Loaded {} labels from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parses label text already held in memory.
    pub fn parse(contents: &str) -> Result<Self, ClassifierError> {
        let mut labels: Vec<&str> = contents.lines().map(str::trim).collect();
        while labels.last().is_some_and(|line| line.is_empty()) {
            labels.pop();
        }
        if let Some(pos) = labels.iter().position(|line| line.is_empty()) {
            return Err(ClassifierError::ArtifactLoadError(format!(
                "Label file has a blank line at line {}",
                pos + 1
            )));
        }
        Self::from_labels(labels)
    }

    pub fn from_labels<S: Into<String>>(labels: Vec<S>) -> Result<Self, ClassifierError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ClassifierError::ArtifactLoadError(
                "Label table is empty".to_string(),
            ));
        }
        Ok(Self { labels })
    }

    /// Looks up the label for a class index.
    ///
    /// An index past the end means the artifact and the label file disagree;
    /// it is reported as an error instead of being clamped.
    pub fn label_for(&self, index: usize) -> Result<&str, ClassifierError> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifierError::IndexRangeError {
                index,
                len: self.labels.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
