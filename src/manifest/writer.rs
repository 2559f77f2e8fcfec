//! Manifest file writing
//!
//! This module provides:
//! - ManifestWriter for persisting modified package.json files
//! - Dry-run mode support (no actual file modifications)
//! - Per-file error collection so one failure does not block the rest

use super::PackageJsonFile;
use crate::error::ManifestError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writer for package.json files
pub struct ManifestWriter {
    /// Whether to run in dry-run mode (no file modifications)
    dry_run: bool,
}

/// Result of writing one manifest file
#[derive(Debug)]
pub struct WriteResult {
    pub path: PathBuf,
    /// Whether the contents differ from what was read
    pub changed: bool,
    /// Whether the file was actually written
    pub file_modified: bool,
    pub errors: Vec<String>,
}

impl WriteResult {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            changed: false,
            file_modified: false,
            errors: Vec::new(),
        }
    }

    /// Returns true if any errors occurred
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl ManifestWriter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Create a ManifestWriter in dry-run mode
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Write `file` if its contents changed. Unchanged files are never touched.
    pub fn write(&self, file: &PackageJsonFile) -> Result<WriteResult, ManifestError> {
        let mut result = WriteResult::new(&file.path);
        if !file.has_changed() {
            return Ok(result);
        }
        result.changed = true;

        let content = file.serialize()?;
        if self.dry_run {
            debug!(path = %file.path.display(), "dry run, not writing");
            return Ok(result);
        }
        write_manifest(&file.path, &content)?;
        result.file_modified = true;
        Ok(result)
    }

    /// Write every changed file, collecting failures instead of stopping
    pub fn write_all<'a>(&self, files: impl IntoIterator<Item = &'a PackageJsonFile>) -> Vec<WriteResult> {
        files
            .into_iter()
            .filter(|file| file.has_changed())
            .map(|file| match self.write(file) {
                Ok(result) => result,
                Err(e) => {
                    warn!("{}", e);
                    let mut result = WriteResult::new(&file.path);
                    result.changed = true;
                    result.errors.push(e.to_string());
                    result
                }
            })
            .collect()
    }
}

/// Write content to a manifest file
pub fn write_manifest(path: &Path, content: &str) -> Result<(), ManifestError> {
    fs::write(path, content).map_err(|e| ManifestError::write_error(path, e))
}
