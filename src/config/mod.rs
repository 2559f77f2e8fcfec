//! Configuration loading
//!
//! An rcfile is searched for in the project root, first found wins:
//! `.depsyncrc.json`, `.depsyncrc` (JSON), `.depsyncrc.toml`, then the
//! `"depsync"` key of package.json. CLI flags override rcfile values.
//! Everything is validated here, before any manifest is touched.

pub mod dependency_type;

pub use dependency_type::{CustomType, DependencyType, Strategy, LOCAL};

use crate::error::ConfigError;
use crate::group::{PatternList, SemverGroup, VersionGroup};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const RCFILE_NAMES: [&str; 3] = [".depsyncrc.json", ".depsyncrc", ".depsyncrc.toml"];
const PACKAGE_JSON_KEY: &str = "depsync";

/// Specifier kind names accepted by `specifierTypes`
pub const SPECIFIER_KINDS: [&str; 10] = [
    "exact",
    "range",
    "latest",
    "alias",
    "file",
    "hosted-git",
    "tag",
    "url",
    "workspace-protocol",
    "unsupported",
];

/// The rcfile as written by the user
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rcfile {
    pub source: Vec<String>,
    pub dependency_types: Vec<String>,
    pub specifier_types: Vec<String>,
    pub filter: Option<String>,
    pub semver_groups: Vec<Value>,
    pub version_groups: Vec<Value>,
    pub custom_types: BTreeMap<String, CustomType>,
}

impl Rcfile {
    /// Load an rcfile, TOML when the extension says so, JSON otherwise
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| ConfigError::parse_error(path, e.to_string()))
        } else if path.file_name().is_some_and(|name| name == "package.json") {
            Self::from_package_json(path, &content)
                .map(Option::unwrap_or_default)
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::parse_error(path, e.to_string()))
        }
    }

    /// Find and load the rcfile for `root`. None when there is none.
    pub fn discover(root: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        for name in RCFILE_NAMES {
            let path = root.join(name);
            if path.is_file() {
                return Self::load(&path).map(|rc| Some((path, rc)));
            }
        }

        let package_json = root.join("package.json");
        let Ok(content) = fs::read_to_string(&package_json) else {
            return Ok(None);
        };
        Ok(Self::from_package_json(&package_json, &content)?.map(|rc| (package_json, rc)))
    }

    /// The `"depsync"` key of a package.json. An unparsable package.json is
    /// left for the manifest layer to report.
    fn from_package_json(path: &Path, content: &str) -> Result<Option<Self>, ConfigError> {
        let Ok(json) = serde_json::from_str::<Value>(content) else {
            return Ok(None);
        };
        match json.get(PACKAGE_JSON_KEY) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ConfigError::parse_error(path, e.to_string())),
        }
    }
}

/// Values given on the command line; `None` keeps the rcfile value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<Vec<String>>,
    pub filter: Option<String>,
    pub dependency_types: Option<Vec<String>>,
    pub specifier_types: Option<Vec<String>>,
}

impl Overrides {
    pub fn apply(&self, rcfile: &mut Rcfile) {
        if let Some(source) = &self.source {
            rcfile.source = source.clone();
        }
        if let Some(filter) = &self.filter {
            rcfile.filter = Some(filter.clone());
        }
        if let Some(types) = &self.dependency_types {
            rcfile.dependency_types = types.clone();
        }
        if let Some(types) = &self.specifier_types {
            rcfile.specifier_types = types.clone();
        }
    }
}

/// Validated configuration for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    /// Manifest globs; empty means workspace discovery
    pub source: Vec<String>,
    /// Enabled dependency types, in scan order
    pub dependency_types: Vec<DependencyType>,
    /// Accepted specifier kinds
    pub specifier_types: PatternList,
    pub filter: Option<Regex>,
    pub semver_groups: Vec<SemverGroup>,
    pub version_groups: Vec<VersionGroup>,
}

impl Config {
    /// Discover (or read `config_path`), apply `overrides` and validate
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError> {
        let mut rcfile = match config_path {
            Some(path) => Rcfile::load(path)?,
            None => match Rcfile::discover(root)? {
                Some((path, rcfile)) => {
                    debug!(path = %path.display(), "loaded config");
                    rcfile
                }
                None => Rcfile::default(),
            },
        };
        overrides.apply(&mut rcfile);
        Self::from_rcfile(root, rcfile)
    }

    pub fn from_rcfile(root: &Path, rcfile: Rcfile) -> Result<Self, ConfigError> {
        let filter = match rcfile.filter.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| ConfigError::InvalidFilter {
                value: pattern.to_string(),
                message: e.to_string(),
            })?),
        };

        for entry in &rcfile.specifier_types {
            let name = entry.strip_prefix('!').unwrap_or(entry);
            let is_glob = name.contains(['*', '?', '[']);
            if !is_glob && !SPECIFIER_KINDS.contains(&name) {
                return Err(ConfigError::InvalidPattern {
                    value: entry.clone(),
                    message: "unknown specifier type".to_string(),
                });
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            source: rcfile.source,
            dependency_types: dependency_type::resolve(
                &rcfile.custom_types,
                &rcfile.dependency_types,
            )?,
            specifier_types: PatternList::new(&rcfile.specifier_types)?,
            semver_groups: SemverGroup::list(&rcfile.semver_groups, filter.as_ref())?,
            version_groups: VersionGroup::list(&rcfile.version_groups, filter.as_ref())?,
            filter,
        })
    }
}
