//! Semver groups decide which range prefix each specifier should use

use super::GroupSelector;
use crate::domain::{FixableKind, Instance, Report, UnfixableKind, ValidKind};
use crate::error::{ConfigError, NonSemverError};
use crate::specifier::{SemverRange, Specifier};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

const POLICY_KEYS: [&str; 2] = ["isIgnored", "range"];

#[derive(Debug, Clone)]
pub enum SemverPolicy {
    /// Catch-all: semver ranges are not checked
    Disabled,
    /// Names not matching `filter`; never matches when there is no filter
    FilteredOut { filter: Option<Regex> },
    Ignored,
    WithRange(SemverRange),
}

#[derive(Debug, Clone)]
pub struct SemverGroup {
    pub selector: GroupSelector,
    pub policy: SemverPolicy,
}

impl SemverGroup {
    /// Build the ordered semver groups: the filtered-out sentinel, each
    /// configured group, then the disabled catch-all.
    pub fn list(config: &[Value], filter: Option<&Regex>) -> Result<Vec<SemverGroup>, ConfigError> {
        let mut groups = Vec::with_capacity(config.len() + 2);
        groups.push(SemverGroup {
            selector: GroupSelector::any("filtered out"),
            policy: SemverPolicy::FilteredOut {
                filter: filter.cloned(),
            },
        });
        for (index, value) in config.iter().enumerate() {
            groups.push(Self::from_config(index, value)?);
        }
        groups.push(SemverGroup {
            selector: GroupSelector::any("default"),
            policy: SemverPolicy::Disabled,
        });
        Ok(groups)
    }

    pub fn from_config(index: usize, value: &Value) -> Result<SemverGroup, ConfigError> {
        let group = value
            .as_object()
            .ok_or_else(|| ConfigError::semver_group(index, "must be an object"))?;
        let selector =
            GroupSelector::from_config(group).map_err(|e| ConfigError::semver_group(index, e))?;

        let present: Vec<&str> = POLICY_KEYS
            .iter()
            .copied()
            .filter(|key| group.contains_key(*key))
            .collect();
        let policy = match present.as_slice() {
            [] => {
                return Err(ConfigError::semver_group(
                    index,
                    "expected one of 'isIgnored' or 'range'",
                ))
            }
            ["isIgnored"] => match group.get("isIgnored") {
                Some(Value::Bool(true)) => SemverPolicy::Ignored,
                _ => {
                    return Err(ConfigError::semver_group(index, "'isIgnored' must be true"))
                }
            },
            ["range"] => match group.get("range") {
                Some(Value::String(range)) => SemverPolicy::WithRange(
                    range
                        .parse()
                        .map_err(|e: ConfigError| ConfigError::semver_group(index, e.to_string()))?,
                ),
                _ => return Err(ConfigError::semver_group(index, "'range' must be a string")),
            },
            _ => {
                return Err(ConfigError::semver_group(
                    index,
                    format!("only one of {} may be set", present.join(", ")),
                ))
            }
        };
        Ok(SemverGroup { selector, policy })
    }

    pub fn can_add(&self, instance: &Instance, local_packages: &HashSet<String>) -> bool {
        let policy_accepts = match &self.policy {
            SemverPolicy::FilteredOut { filter } => filter
                .as_ref()
                .is_some_and(|filter| !filter.is_match(&instance.name)),
            _ => true,
        };
        policy_accepts && self.selector.matches(instance, local_packages)
    }

    /// The specifier `specifier` should be under this group's policy
    pub fn get_fixed(&self, specifier: &Specifier) -> Result<Specifier, NonSemverError> {
        match &self.policy {
            SemverPolicy::WithRange(range) => {
                if specifier.is_workspace_protocol() {
                    return Ok(specifier.clone());
                }
                let semver = specifier.get_semver()?;
                specifier.set_semver(&range.apply(semver))
            }
            _ => Ok(specifier.clone()),
        }
    }

    /// Judge one instance. `pin` is the pinned version of the instance's
    /// version group, if it has one.
    pub fn inspect(&self, instance: &Instance, pin: Option<&str>) -> Report {
        let id = instance.id;
        match &self.policy {
            SemverPolicy::Disabled => Report::valid(ValidKind::Disabled, id),
            SemverPolicy::FilteredOut { .. } => Report::valid(ValidKind::FilteredOut, id),
            SemverPolicy::Ignored => Report::valid(ValidKind::Ignored, id),
            SemverPolicy::WithRange(_) => {
                if !instance.specifier.has_semver() {
                    return Report::unfixable(UnfixableKind::UnsupportedMismatch, id);
                }
                if instance.is_local() || pin == Some(instance.raw()) {
                    return Report::valid(ValidKind::Valid, id);
                }
                match self.get_fixed(&instance.specifier) {
                    Ok(fixed) if fixed.raw() == instance.raw() => {
                        Report::valid(ValidKind::Valid, id)
                    }
                    Ok(fixed) => Report::fixable(FixableKind::SemverRangeMismatch, id, fixed),
                    Err(_) => Report::unfixable(UnfixableKind::UnsupportedMismatch, id),
                }
            }
        }
    }
}
