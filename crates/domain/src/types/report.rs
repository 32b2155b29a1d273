//! Outcome of an install run

use serde::{Deserialize, Serialize};

use super::bundle::BundlePath;

/// A file that could not be fetched or written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    /// Bundle-relative path, or the repository path if it never resolved
    pub path: String,
    pub reason: String,
}

impl FileFailure {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { path: path.into(), reason: reason.into() }
    }
}

/// Per-file results of installing a bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub written: Vec<BundlePath>,
    /// Existing files left untouched
    pub skipped: Vec<BundlePath>,
    pub failed: Vec<FileFailure>,
    pub dry_run: bool,
}

impl InstallReport {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run, ..Self::default() }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len() + self.failed.len()
    }

    /// Fold another report's results into this one
    pub fn merge(&mut self, other: Self) {
        self.written.extend(other.written);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }

    /// One-line summary for terminal output
    pub fn summary(&self) -> String {
        let verb = if self.dry_run { "would write" } else { "wrote" };
        format!(
            "{verb} {} file(s), skipped {}, failed {}",
            self.written.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}
