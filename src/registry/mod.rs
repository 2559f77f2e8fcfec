//! Registry adapters for fetching package version information
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - npm Registry adapter

mod client;
mod npm;

pub use client::HttpClient;
pub use npm::NpmAdapter;

use crate::error::RegistryError;
use crate::update::VersionInfo;
use async_trait::async_trait;

/// What a registry knows about one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersions {
    pub name: String,
    /// The `latest` dist-tag, when published
    pub latest: Option<String>,
    /// Every published version, ascending
    pub versions: Vec<VersionInfo>,
}

/// Trait for registry adapters
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    fn registry_name(&self) -> &'static str;

    /// Fetch available versions for a package
    async fn fetch_versions(&self, package: &str) -> Result<PackageVersions, RegistryError>;
}
