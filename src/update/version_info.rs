//! Version information from registry
//!
//! A published version with its release date, ordered by semver.

use crate::specifier::coerce;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A published package version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub released_at: DateTime<Utc>,
}

impl VersionInfo {
    pub fn new(version: impl Into<String>, released_at: DateTime<Utc>) -> Self {
        Self {
            version: version.into(),
            released_at,
        }
    }

    /// Create a VersionInfo with current time as release date
    pub fn now(version: impl Into<String>) -> Self {
        Self::new(version, Utc::now())
    }

    pub fn is_prerelease(&self) -> bool {
        is_prerelease_version(&self.version)
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(&self.version, &other.version)
    }
}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn to_semver(text: &str) -> Version {
    let text = text.trim().trim_start_matches(['v', '=']);
    Version::parse(text)
        .ok()
        .or_else(|| coerce(text))
        .unwrap_or_else(|| Version::new(0, 0, 0))
}

/// Compare two version strings by semver precedence. Text which is not a
/// version sorts as 0.0.0.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    to_semver(a).cmp_precedence(&to_semver(b))
}

/// Returns true for `1.0.0-beta.1` style versions
pub fn is_prerelease_version(text: &str) -> bool {
    !to_semver(text).pre.is_empty()
}
