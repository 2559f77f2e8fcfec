//! Dependency types: where in a package.json versions are declared
//!
//! Built-in types cover the standard npm sections plus the package's own
//! `name`/`version` pair (`local`). `customTypes` adds more.

use crate::error::ConfigError;
use crate::group::PatternList;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Name of the built-in type for a package's own version
pub const LOCAL: &str = "local";

/// How a dependency type stores its versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Strategy {
    /// `"name"` and `"version"` properties of the package itself
    #[serde(rename = "name~version")]
    NameAndVersionProps,
    /// An object of dependency name to specifier at `path`
    #[serde(rename = "versionsByName")]
    VersionsByName,
    /// A single `"name@version"` string at `path`
    #[serde(rename = "name@version")]
    NamedVersionString,
}

/// A location in package.json which declares dependency versions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyType {
    /// Name used by `dependencyTypes` filters
    pub name: String,
    /// Dotted path into package.json, e.g. `pnpm.overrides`
    pub path: String,
    pub strategy: Strategy,
}

/// A `customTypes` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomType {
    pub path: String,
    pub strategy: Strategy,
}

impl DependencyType {
    pub fn new(name: impl Into<String>, path: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            strategy,
        }
    }

    /// Returns true for the package's own version
    pub fn is_local(&self) -> bool {
        self.strategy == Strategy::NameAndVersionProps
    }

    /// Path segments of `path`
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}

/// The dependency types every run knows about
pub fn built_in() -> Vec<DependencyType> {
    use Strategy::*;
    vec![
        DependencyType::new(LOCAL, "version", NameAndVersionProps),
        DependencyType::new("prod", "dependencies", VersionsByName),
        DependencyType::new("dev", "devDependencies", VersionsByName),
        DependencyType::new("peer", "peerDependencies", VersionsByName),
        DependencyType::new("optional", "optionalDependencies", VersionsByName),
        DependencyType::new("overrides", "overrides", VersionsByName),
        DependencyType::new("pnpmOverrides", "pnpm.overrides", VersionsByName),
        DependencyType::new("resolutions", "resolutions", VersionsByName),
    ]
}

/// Build the enabled dependency types from custom types and the
/// `dependencyTypes` filter (empty enables everything).
pub fn resolve(
    custom: &BTreeMap<String, CustomType>,
    enabled: &[String],
) -> Result<Vec<DependencyType>, ConfigError> {
    let mut all = built_in();
    for (name, custom_type) in custom {
        if all.iter().any(|t| &t.name == name) {
            return Err(ConfigError::InvalidCustomType {
                name: name.clone(),
                message: "name clashes with a built-in dependency type".to_string(),
            });
        }
        if custom_type.strategy == Strategy::NameAndVersionProps {
            return Err(ConfigError::InvalidCustomType {
                name: name.clone(),
                message: "strategy must be 'versionsByName' or 'name@version'".to_string(),
            });
        }
        if custom_type.path.is_empty() {
            return Err(ConfigError::InvalidCustomType {
                name: name.clone(),
                message: "path must not be empty".to_string(),
            });
        }
        all.push(DependencyType::new(
            name,
            &custom_type.path,
            custom_type.strategy,
        ));
    }

    for entry in enabled {
        let name = entry.strip_prefix('!').unwrap_or(entry);
        let is_glob = name.contains(['*', '?', '[']);
        if !is_glob && !all.iter().any(|t| t.name == name) {
            return Err(ConfigError::InvalidPattern {
                value: entry.clone(),
                message: "unknown dependency type".to_string(),
            });
        }
    }

    let filter = PatternList::new(enabled)?;
    Ok(all
        .into_iter()
        .filter(|t| filter.matches(&t.name, false))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(types: &[DependencyType]) -> Vec<&str> {
        types.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_built_in() {
        let types = built_in();
        assert_eq!(
            names(&types),
            vec![
                "local",
                "prod",
                "dev",
                "peer",
                "optional",
                "overrides",
                "pnpmOverrides",
                "resolutions"
            ]
        );
        assert!(types[0].is_local());
        assert!(!types[1].is_local());
    }

    #[test]
    fn test_path_segments() {
        let t = DependencyType::new("pnpmOverrides", "pnpm.overrides", Strategy::VersionsByName);
        assert_eq!(t.path_segments().collect::<Vec<_>>(), vec!["pnpm", "overrides"]);
    }

    #[test]
    fn test_resolve_all_by_default() {
        let types = resolve(&BTreeMap::new(), &[]).unwrap();
        assert_eq!(types.len(), 8);
    }

    #[test]
    fn test_resolve_positive_filter() {
        let enabled = vec!["prod".to_string(), "dev".to_string()];
        let types = resolve(&BTreeMap::new(), &enabled).unwrap();
        assert_eq!(names(&types), vec!["prod", "dev"]);
    }

    #[test]
    fn test_resolve_negated_filter() {
        let enabled = vec!["!peer".to_string(), "!local".to_string()];
        let types = resolve(&BTreeMap::new(), &enabled).unwrap();
        assert!(!names(&types).contains(&"peer"));
        assert!(!names(&types).contains(&"local"));
        assert!(names(&types).contains(&"prod"));
    }

    #[test]
    fn test_resolve_unknown_type() {
        let enabled = vec!["nope".to_string()];
        let err = resolve(&BTreeMap::new(), &enabled).unwrap_err();
        assert!(format!("{}", err).contains("unknown dependency type"));
    }

    #[test]
    fn test_resolve_custom_types() {
        let mut custom = BTreeMap::new();
        custom.insert(
            "engines".to_string(),
            CustomType {
                path: "engines".to_string(),
                strategy: Strategy::VersionsByName,
            },
        );
        custom.insert(
            "packageManager".to_string(),
            CustomType {
                path: "packageManager".to_string(),
                strategy: Strategy::NamedVersionString,
            },
        );
        let types = resolve(&custom, &["engines".to_string()]).unwrap();
        assert_eq!(names(&types), vec!["engines"]);

        let all = resolve(&custom, &[]).unwrap();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_resolve_custom_type_clash() {
        let mut custom = BTreeMap::new();
        custom.insert(
            "prod".to_string(),
            CustomType {
                path: "dependencies".to_string(),
                strategy: Strategy::VersionsByName,
            },
        );
        assert!(resolve(&custom, &[]).is_err());
    }

    #[test]
    fn test_strategy_deserialize() {
        let custom: CustomType =
            serde_json::from_str(r#"{"path":"packageManager","strategy":"name@version"}"#)
                .unwrap();
        assert_eq!(custom.strategy, Strategy::NamedVersionString);
    }
}
