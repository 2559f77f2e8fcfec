//! package.json discovery, parsing and writing
//!
//! This module provides functionality to:
//! - Find the package.json files of a monorepo (workspaces, pnpm-workspace.yaml, globs)
//! - Read dependency declarations out of them
//! - Write changed specifiers back without disturbing formatting

mod detector;
mod package_json;
mod writer;

pub use detector::detect_manifests;
pub use package_json::PackageJsonFile;
pub use writer::{write_manifest, ManifestWriter, WriteResult};

use crate::error::ManifestError;
use std::path::PathBuf;

/// Read every path, stopping at the first unreadable manifest
pub fn read_all(paths: &[PathBuf]) -> Result<Vec<PackageJsonFile>, ManifestError> {
    paths.iter().map(|p| PackageJsonFile::read(p)).collect()
}
