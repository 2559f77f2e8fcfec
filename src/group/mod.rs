//! Group classification
//!
//! Every instance belongs to exactly one semver group and exactly one
//! version group: the first group (in declaration order) whose selector
//! accepts it. The last group of each list is a catch-all.

mod semver_group;
mod version_group;

pub use semver_group::{SemverGroup, SemverPolicy};
pub use version_group::{DependencyReports, Prefer, VersionGroup, VersionPolicy};

use crate::domain::Instance;
use crate::error::ConfigError;
use glob::Pattern;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Token in `dependencies` which stands for any package developed in this repository
pub const LOCAL_TOKEN: &str = "$LOCAL";

#[derive(Debug, Clone)]
enum Matcher {
    Local,
    Glob(Pattern),
}

impl Matcher {
    fn matches(&self, value: &str, is_local: bool) -> bool {
        match self {
            Matcher::Local => is_local,
            Matcher::Glob(pattern) => pattern.matches(value),
        }
    }
}

/// A list of glob patterns where `!` entries negate
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    positive: Vec<Matcher>,
    negative: Vec<Matcher>,
}

impl PatternList {
    pub fn new(entries: &[String]) -> Result<Self, ConfigError> {
        let mut list = PatternList::default();
        for entry in entries {
            let (negated, body) = match entry.strip_prefix('!') {
                Some(body) => (true, body),
                None => (false, entry.as_str()),
            };
            if body == "**" && !negated {
                continue;
            }
            let matcher = if body == LOCAL_TOKEN {
                Matcher::Local
            } else {
                Matcher::Glob(Pattern::new(body).map_err(|e| ConfigError::InvalidPattern {
                    value: entry.clone(),
                    message: e.msg.to_string(),
                })?)
            };
            if negated {
                list.negative.push(matcher);
            } else {
                list.positive.push(matcher);
            }
        }
        Ok(list)
    }

    /// Accepts everything
    pub fn any() -> Self {
        Self::default()
    }

    /// `is_local` tells whether `value` names a package of this repository
    pub fn matches(&self, value: &str, is_local: bool) -> bool {
        if self.negative.iter().any(|m| m.matches(value, is_local)) {
            return false;
        }
        self.positive.is_empty() || self.positive.iter().any(|m| m.matches(value, is_local))
    }
}

/// The matching rules shared by every group
#[derive(Debug, Clone, Default)]
pub struct GroupSelector {
    pub label: String,
    dependencies: PatternList,
    dependency_types: PatternList,
    packages: PatternList,
    specifier_types: PatternList,
}

impl GroupSelector {
    /// A selector which accepts every instance
    pub fn any(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Read the selector keys of a group object
    pub fn from_config(group: &Map<String, Value>) -> Result<Self, String> {
        let label = match group.get("label") {
            None => String::new(),
            Some(Value::String(label)) => label.clone(),
            Some(_) => return Err("'label' must be a string".to_string()),
        };
        let list = |key: &str| -> Result<PatternList, String> {
            let entries = string_list(group, key)?;
            PatternList::new(&entries).map_err(|e| e.to_string())
        };
        Ok(Self {
            label,
            dependencies: list("dependencies")?,
            dependency_types: list("dependencyTypes")?,
            packages: list("packages")?,
            specifier_types: list("specifierTypes")?,
        })
    }

    pub fn matches(&self, instance: &Instance, local_packages: &HashSet<String>) -> bool {
        self.dependency_types
            .matches(&instance.dependency_type.name, false)
            && self.packages.matches(&instance.package_name, false)
            && self
                .dependencies
                .matches(&instance.name, local_packages.contains(&instance.name))
            && self
                .specifier_types
                .matches(instance.specifier.kind_name(), false)
    }
}

/// Read an optional array of strings
pub(crate) fn string_list(group: &Map<String, Value>, key: &str) -> Result<Vec<String>, String> {
    match group.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(format!("'{}' must be an array of strings", key)),
            })
            .collect(),
        Some(_) => Err(format!("'{}' must be an array of strings", key)),
    }
}

/// Group index of every instance, indexed by instance id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub semver: Vec<usize>,
    pub version: Vec<usize>,
}

/// Assign every instance to its first matching semver and version group
pub fn classify(
    instances: &[Instance],
    semver_groups: &[SemverGroup],
    version_groups: &[VersionGroup],
    local_packages: &HashSet<String>,
) -> Classification {
    instances
        .iter()
        .fold(Classification::default(), |mut acc, instance| {
            let semver = semver_groups
                .iter()
                .position(|g| g.can_add(instance, local_packages))
                .unwrap_or(semver_groups.len().saturating_sub(1));
            let version = version_groups
                .iter()
                .position(|g| g.can_add(instance, local_packages))
                .unwrap_or(version_groups.len().saturating_sub(1));
            acc.semver.push(semver);
            acc.version.push(version);
            acc
        })
}
