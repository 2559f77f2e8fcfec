//! Run summary types
//!
//! Counts reports per family and tracks what happened to each manifest.

use super::Report;
use serde::Serialize;
use std::path::PathBuf;

/// What happened to a single package.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestResult {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Number of instances changed in this file
    pub changes: usize,
    /// Whether the file was (or in a dry run, would be) rewritten
    pub modified: bool,
    /// Write failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ManifestResult {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            changes: 0,
            modified: false,
            error: None,
        }
    }
}

/// Overall summary of one lint, fix or update run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub valid: usize,
    pub fixable: usize,
    pub unfixable: usize,
    /// Manifests touched by fix or update
    pub manifests: Vec<ManifestResult>,
    pub dry_run: bool,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Count `reports` by family
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a Report>, dry_run: bool) -> Self {
        let mut summary = Self::new(dry_run);
        for report in reports {
            summary.add_report(report);
        }
        summary
    }

    pub fn add_report(&mut self, report: &Report) {
        match report {
            Report::Valid { .. } => self.valid += 1,
            Report::Fixable { .. } => self.fixable += 1,
            Report::Unfixable { .. } => self.unfixable += 1,
        }
    }

    pub fn add_manifest(&mut self, manifest: ManifestResult) {
        self.manifests.push(manifest);
    }

    /// Number of reports counted
    pub fn total(&self) -> usize {
        self.valid + self.fixable + self.unfixable
    }

    pub fn has_invalid(&self) -> bool {
        self.fixable + self.unfixable > 0
    }

    pub fn files_modified(&self) -> usize {
        self.manifests.iter().filter(|m| m.modified).count()
    }

    pub fn total_changes(&self) -> usize {
        self.manifests.iter().map(|m| m.changes).sum()
    }

    pub fn has_write_errors(&self) -> bool {
        self.manifests.iter().any(|m| m.error.is_some())
    }
}
