//! Version groups decide which version every instance of a dependency should have

use super::{string_list, GroupSelector};
use crate::domain::{FixableKind, Instance, Report, UnfixableKind, ValidKind};
use crate::error::ConfigError;
use crate::specifier::{get_highest, get_lowest, NpmRange, Specifier, Variant};
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const POLICY_KEYS: [&str; 6] = [
    "isBanned",
    "isIgnored",
    "pinVersion",
    "snapTo",
    "policy",
    "preferVersion",
];

/// Which end of the version order a standard group settles on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    HighestSemver,
    LowestSemver,
}

#[derive(Debug, Clone)]
pub enum VersionPolicy {
    /// Names not matching `filter`; never matches when there is no filter
    FilteredOut { filter: Option<Regex> },
    Banned,
    Ignored,
    Pinned { pin: String },
    /// Package names, in priority order, whose versions everyone follows
    SnappedTo { packages: Vec<String> },
    SameRange,
    Standard { prefer: Prefer },
}

#[derive(Debug, Clone)]
pub struct VersionGroup {
    pub selector: GroupSelector,
    pub policy: VersionPolicy,
}

/// Reports for every instance of one dependency within one version group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReports {
    pub name: String,
    pub reports: Vec<Report>,
}

impl DependencyReports {
    pub fn has_invalid(&self) -> bool {
        self.reports.iter().any(Report::is_invalid)
    }
}

impl VersionGroup {
    /// Build the ordered version groups: the filtered-out sentinel, each
    /// configured group, then a highest-semver catch-all.
    pub fn list(config: &[Value], filter: Option<&Regex>) -> Result<Vec<VersionGroup>, ConfigError> {
        let mut groups = Vec::with_capacity(config.len() + 2);
        groups.push(VersionGroup {
            selector: GroupSelector::any("filtered out"),
            policy: VersionPolicy::FilteredOut {
                filter: filter.cloned(),
            },
        });
        for (index, value) in config.iter().enumerate() {
            groups.push(Self::from_config(index, value)?);
        }
        groups.push(VersionGroup {
            selector: GroupSelector::any("default"),
            policy: VersionPolicy::Standard {
                prefer: Prefer::HighestSemver,
            },
        });
        Ok(groups)
    }

    pub fn from_config(index: usize, value: &Value) -> Result<VersionGroup, ConfigError> {
        let err = |message: String| ConfigError::version_group(index, message);
        let group = value
            .as_object()
            .ok_or_else(|| err("must be an object".to_string()))?;
        let selector = GroupSelector::from_config(group).map_err(err)?;

        let present: Vec<&str> = POLICY_KEYS
            .iter()
            .copied()
            .filter(|key| group.contains_key(*key))
            .collect();
        let key = match present.as_slice() {
            [] => None,
            [key] => Some(*key),
            _ => return Err(err(format!("only one of {} may be set", present.join(", ")))),
        };

        let policy = match key {
            None => VersionPolicy::Standard {
                prefer: Prefer::HighestSemver,
            },
            Some("isBanned") => match group.get("isBanned") {
                Some(Value::Bool(true)) => VersionPolicy::Banned,
                _ => return Err(err("'isBanned' must be true".to_string())),
            },
            Some("isIgnored") => match group.get("isIgnored") {
                Some(Value::Bool(true)) => VersionPolicy::Ignored,
                _ => return Err(err("'isIgnored' must be true".to_string())),
            },
            Some("pinVersion") => match group.get("pinVersion") {
                Some(Value::String(pin)) if !pin.trim().is_empty() => {
                    VersionPolicy::Pinned { pin: pin.clone() }
                }
                _ => return Err(err("'pinVersion' must be a non-empty string".to_string())),
            },
            Some("snapTo") => {
                let packages = string_list(group, "snapTo").map_err(err)?;
                if packages.is_empty() {
                    return Err(err("'snapTo' must name at least one package".to_string()));
                }
                VersionPolicy::SnappedTo { packages }
            }
            Some("policy") => match group.get("policy").and_then(Value::as_str) {
                Some("sameRange") => VersionPolicy::SameRange,
                _ => return Err(err("'policy' must be 'sameRange'".to_string())),
            },
            Some(_) => match group.get("preferVersion") {
                Some(Value::String(p)) if p == "highestSemver" => VersionPolicy::Standard {
                    prefer: Prefer::HighestSemver,
                },
                Some(Value::String(p)) if p == "lowestSemver" => VersionPolicy::Standard {
                    prefer: Prefer::LowestSemver,
                },
                _ => {
                    return Err(err(
                        "'preferVersion' must be 'highestSemver' or 'lowestSemver'".to_string(),
                    ))
                }
            },
        };
        Ok(VersionGroup { selector, policy })
    }

    pub fn can_add(&self, instance: &Instance, local_packages: &HashSet<String>) -> bool {
        let policy_accepts = match &self.policy {
            VersionPolicy::FilteredOut { filter } => filter
                .as_ref()
                .is_some_and(|filter| !filter.is_match(&instance.name)),
            _ => true,
        };
        policy_accepts && self.selector.matches(instance, local_packages)
    }

    /// Pinned version of this group, if it is a pinned group
    pub fn pin(&self) -> Option<&str> {
        match &self.policy {
            VersionPolicy::Pinned { pin } => Some(pin),
            _ => None,
        }
    }

    /// Judge every member of this group, one entry per dependency name in
    /// order of first appearance.
    ///
    /// `with_range` returns the expected specifier adjusted by the
    /// instance's semver group.
    pub fn inspect_all<F>(&self, members: &[&Instance], with_range: F) -> Vec<DependencyReports>
    where
        F: Fn(&Instance, &Specifier) -> Specifier,
    {
        bucket_by_name(members)
            .into_iter()
            .map(|(name, instances)| DependencyReports {
                reports: self.inspect_dependency(&instances, &with_range),
                name,
            })
            .collect()
    }

    fn inspect_dependency<F>(&self, instances: &[&Instance], with_range: &F) -> Vec<Report>
    where
        F: Fn(&Instance, &Specifier) -> Specifier,
    {
        match &self.policy {
            VersionPolicy::FilteredOut { .. } => all_valid(instances, ValidKind::FilteredOut),
            VersionPolicy::Ignored => all_valid(instances, ValidKind::Ignored),
            VersionPolicy::Banned => instances
                .iter()
                .map(|i| {
                    if i.is_local() {
                        Report::unfixable(UnfixableKind::RefuseToBanLocal, i.id)
                    } else {
                        Report::fixable(FixableKind::Banned, i.id, Specifier::delete(i.id))
                    }
                })
                .collect(),
            VersionPolicy::Pinned { pin } => instances
                .iter()
                .map(|i| {
                    if i.raw() == pin {
                        Report::valid(ValidKind::Valid, i.id)
                    } else if i.is_local() {
                        Report::unfixable(UnfixableKind::RefuseToPinLocal, i.id)
                    } else {
                        Report::fixable(
                            FixableKind::PinnedMismatch,
                            i.id,
                            Specifier::create(i.id, pin.as_str()),
                        )
                    }
                })
                .collect(),
            VersionPolicy::SnappedTo { packages } => {
                inspect_snapped_to(instances, packages, with_range)
            }
            VersionPolicy::SameRange => inspect_same_range(instances),
            VersionPolicy::Standard { prefer } => inspect_standard(instances, *prefer, with_range),
        }
    }
}

fn all_valid(instances: &[&Instance], kind: ValidKind) -> Vec<Report> {
    instances.iter().map(|i| Report::valid(kind, i.id)).collect()
}

fn bucket_by_name<'a>(members: &[&'a Instance]) -> Vec<(String, Vec<&'a Instance>)> {
    let mut order: Vec<(String, Vec<&'a Instance>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for &instance in members {
        match index.get(instance.name.as_str()) {
            Some(&i) => order[i].1.push(instance),
            None => {
                index.insert(instance.name.as_str(), order.len());
                order.push((instance.name.clone(), vec![instance]));
            }
        }
    }
    order
}

/// Valid when `instance` already matches `expected` adjusted by its semver group
fn expect<F>(instance: &Instance, expected: &Specifier, kind: FixableKind, with_range: &F) -> Report
where
    F: Fn(&Instance, &Specifier) -> Specifier,
{
    let fixed = with_range(instance, expected);
    if fixed.raw() == instance.raw() {
        Report::valid(ValidKind::Valid, instance.id)
    } else {
        Report::fixable(kind, instance.id, fixed)
    }
}

fn inspect_snapped_to<F>(instances: &[&Instance], packages: &[String], with_range: &F) -> Vec<Report>
where
    F: Fn(&Instance, &Specifier) -> Specifier,
{
    let source = packages.iter().find_map(|package| {
        instances
            .iter()
            .find(|i| &i.package_name == package && !i.is_local())
    });
    let Some(source) = source else {
        return instances
            .iter()
            .map(|i| Report::unfixable(UnfixableKind::MissingSnappedToMismatch, i.id))
            .collect();
    };
    // the source as it reads once its own semver group has been applied
    let snapped = with_range(source, &source.specifier);
    instances
        .iter()
        .map(|i| {
            if i.is_local() {
                Report::unfixable(UnfixableKind::RefuseToSnapLocal, i.id)
            } else {
                expect(i, &snapped, FixableKind::SnappedToMismatch, with_range)
            }
        })
        .collect()
}

fn inspect_same_range(instances: &[&Instance]) -> Vec<Report> {
    let ranges: Vec<Option<NpmRange>> = instances
        .iter()
        .map(|i| {
            i.specifier
                .get_semver()
                .ok()
                .and_then(|semver| NpmRange::parse(semver))
        })
        .collect();

    instances
        .iter()
        .zip(&ranges)
        .map(|(instance, range)| {
            let Some(range) = range else {
                return Report::unfixable(UnfixableKind::UnsupportedMismatch, instance.id);
            };
            let mismatches: Vec<String> = instances
                .iter()
                .zip(&ranges)
                .filter(|(other, _)| other.id != instance.id)
                .filter_map(|(other, other_range)| match other_range {
                    Some(other_range) if !range.intersects(other_range) => {
                        Some(other.raw().to_string())
                    }
                    _ => None,
                })
                .collect();
            if mismatches.is_empty() {
                Report::valid(ValidKind::Valid, instance.id)
            } else {
                Report::unfixable(UnfixableKind::SameRangeMismatch { mismatches }, instance.id)
            }
        })
        .collect()
}

fn inspect_standard<F>(instances: &[&Instance], prefer: Prefer, with_range: &F) -> Vec<Report>
where
    F: Fn(&Instance, &Specifier) -> Specifier,
{
    if let Some(local) = instances.iter().find(|i| i.is_local()) {
        return inspect_against_local(instances, local, with_range);
    }

    let first = instances.first().map(|i| i.raw());
    let settled = instances
        .iter()
        .all(|i| Some(i.raw()) == first && with_range(i, &i.specifier).raw() == i.raw());
    if settled {
        return all_valid(instances, ValidKind::Valid);
    }

    let kind = match prefer {
        Prefer::HighestSemver => FixableKind::HighestSemverMismatch,
        Prefer::LowestSemver => FixableKind::LowestSemverMismatch,
    };
    let semver: Vec<&Instance> = instances
        .iter()
        .copied()
        .filter(|i| i.specifier.has_semver())
        .collect();
    // each candidate as it reads after its own semver group fix, so the
    // version and semver fixes agree within one pass
    let fixed: Vec<Specifier> = semver.iter().map(|i| with_range(i, &i.specifier)).collect();
    let current: Vec<&Specifier> = fixed.iter().collect();

    // settle on the preferred specifier as it reads once every semver group
    // has applied its range to it
    let preferred = pick(&current, prefer).map(|first| {
        let ranged: Vec<Specifier> = semver.iter().map(|i| with_range(i, first)).collect();
        let ranged_refs: Vec<&Specifier> = ranged.iter().collect();
        pick(&ranged_refs, prefer)
            .cloned()
            .unwrap_or_else(|| first.clone())
    });

    instances
        .iter()
        .map(|i| match &preferred {
            Some(expected) if i.specifier.has_semver() => expect(i, expected, kind, with_range),
            _ => Report::unfixable(UnfixableKind::UnsupportedMismatch, i.id),
        })
        .collect()
}

fn pick<'a>(specifiers: &[&'a Specifier], prefer: Prefer) -> Option<&'a Specifier> {
    let picked = match prefer {
        Prefer::HighestSemver => get_highest(specifiers),
        Prefer::LowestSemver => get_lowest(specifiers),
    };
    picked.ok().flatten()
}

fn inspect_against_local<F>(instances: &[&Instance], local: &Instance, with_range: &F) -> Vec<Report>
where
    F: Fn(&Instance, &Specifier) -> Specifier,
{
    if *local.specifier.variant() != Variant::Exact {
        return instances
            .iter()
            .map(|i| Report::unfixable(UnfixableKind::MissingLocalVersion, i.id))
            .collect();
    }
    instances
        .iter()
        .map(|i| {
            if i.is_local() || i.specifier.is_workspace_protocol() {
                Report::valid(ValidKind::Valid, i.id)
            } else {
                expect(i, &local.specifier, FixableKind::LocalPackageMismatch, with_range)
            }
        })
        .collect()
}
