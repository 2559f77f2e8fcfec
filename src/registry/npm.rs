//! npm Registry adapter
//!
//! Fetches package metadata from the npm registry.
//! API endpoint: https://registry.npmjs.org/{package}

use crate::error::RegistryError;
use crate::registry::{HttpClient, PackageVersions, RegistryAdapter};
use crate::update::VersionInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::HashMap;

const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

pub struct NpmAdapter {
    client: HttpClient,
    base_url: String,
}

/// The parts of a packument we read
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    /// Publish time per version, plus `created` and `modified`
    #[serde(default)]
    time: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, IgnoredAny>,
}

impl NpmAdapter {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: NPM_REGISTRY_URL.to_string(),
        }
    }

    /// Use another registry, e.g. a private mirror
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Scoped names keep their `@` but encode the `/`
    fn build_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, package.replace('/', "%2F"))
    }
}

/// Versions without a parsable publish time are dropped
fn into_package_versions(package: &str, response: NpmPackageResponse) -> PackageVersions {
    let mut versions: Vec<VersionInfo> = response
        .versions
        .into_keys()
        .filter_map(|version| {
            let released_at = response.time.get(&version)?.parse::<DateTime<Utc>>().ok()?;
            Some(VersionInfo::new(version, released_at))
        })
        .collect();
    versions.sort();

    PackageVersions {
        name: package.to_string(),
        latest: response.dist_tags.get("latest").cloned(),
        versions,
    }
}

#[async_trait]
impl RegistryAdapter for NpmAdapter {
    fn registry_name(&self) -> &'static str {
        "npm"
    }

    async fn fetch_versions(&self, package: &str) -> Result<PackageVersions, RegistryError> {
        let url = self.build_url(package);
        let response: NpmPackageResponse = self
            .client
            .get_json(&url, package, self.registry_name())
            .await?;
        Ok(into_package_versions(package, response))
    }
}
