//! The run context: every package, every instance and their groups
//!
//! Built once from the config and the discovered package.json files, then
//! inspected. Fixing is a separate pass over the finished reports.

use crate::config::Config;
use crate::domain::{Instance, InstanceId, PackageId, Report};
use crate::group::{classify, Classification, DependencyReports};
use crate::manifest::PackageJsonFile;
use crate::specifier::Specifier;
use std::collections::HashSet;
use tracing::debug;

/// Version reports of one version group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReports {
    /// Index into `Config::version_groups`
    pub group: usize,
    pub label: String,
    pub dependencies: Vec<DependencyReports>,
}

/// Every report of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inspection {
    /// Version group reports, in group order; empty groups are left out
    pub version: Vec<GroupReports>,
    /// Semver group report of every instance, indexed by instance id
    pub semver: Vec<Report>,
}

impl Inspection {
    /// All reports, version reports first
    pub fn reports(&self) -> impl Iterator<Item = &Report> {
        self.version
            .iter()
            .flat_map(|g| g.dependencies.iter())
            .flat_map(|d| d.reports.iter())
            .chain(self.semver.iter())
    }

    pub fn has_invalid(&self) -> bool {
        self.reports().any(Report::is_invalid)
    }

    pub fn has_unfixable(&self) -> bool {
        self.reports().any(Report::is_unfixable)
    }
}

pub struct Context {
    pub config: Config,
    pub packages: Vec<PackageJsonFile>,
    pub instances: Vec<Instance>,
    /// Names of the packages developed in this repository
    pub local_packages: HashSet<String>,
    pub classification: Classification,
}

impl Context {
    pub fn create(config: Config, packages: Vec<PackageJsonFile>) -> Self {
        let local_packages: HashSet<String> = packages
            .iter()
            .filter_map(|p| p.name().map(str::to_string))
            .collect();

        let mut instances = Vec::new();
        for (index, package) in packages.iter().enumerate() {
            let package_name = package
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| package.dir().display().to_string());
            for dependency_type in &config.dependency_types {
                for (name, raw) in package.entries(dependency_type) {
                    let instance = Instance::new(
                        InstanceId(instances.len()),
                        name,
                        raw,
                        PackageId(index),
                        &package_name,
                        dependency_type.clone(),
                    );
                    if !config
                        .specifier_types
                        .matches(instance.specifier.kind_name(), false)
                    {
                        continue;
                    }
                    instances.push(instance);
                }
            }
        }
        debug!(
            packages = packages.len(),
            instances = instances.len(),
            "built instances"
        );

        let classification = classify(
            &instances,
            &config.semver_groups,
            &config.version_groups,
            &local_packages,
        );

        Self {
            config,
            packages,
            instances,
            local_packages,
            classification,
        }
    }

    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.0]
    }

    pub fn package(&self, id: PackageId) -> &PackageJsonFile {
        &self.packages[id.0]
    }

    /// `expected` as `instance`'s semver group wants it; unchanged when it
    /// carries no semver
    fn with_range(&self, instance: &Instance, expected: &Specifier) -> Specifier {
        let group = &self.config.semver_groups[self.classification.semver[instance.id.0]];
        let expected = expected.rebind(instance.id);
        group.get_fixed(&expected).unwrap_or(expected)
    }

    /// Judge every instance against its semver and version group
    pub fn inspect(&self) -> Inspection {
        let version = self
            .config
            .version_groups
            .iter()
            .enumerate()
            .filter_map(|(index, group)| {
                let members: Vec<&Instance> = self
                    .instances
                    .iter()
                    .filter(|i| self.classification.version[i.id.0] == index)
                    .collect();
                if members.is_empty() {
                    return None;
                }
                Some(GroupReports {
                    group: index,
                    label: group.selector.label.clone(),
                    dependencies: group.inspect_all(&members, |instance, expected| {
                        self.with_range(instance, expected)
                    }),
                })
            })
            .collect();

        let semver = self
            .instances
            .iter()
            .map(|instance| {
                let semver_group =
                    &self.config.semver_groups[self.classification.semver[instance.id.0]];
                let version_group =
                    &self.config.version_groups[self.classification.version[instance.id.0]];
                semver_group.inspect(instance, version_group.pin())
            })
            .collect();

        Inspection { version, semver }
    }

    /// Point an instance at `specifier` and mirror the edit into its
    /// package.json. Returns false when nothing changed.
    pub fn write(&mut self, id: InstanceId, specifier: Specifier) -> bool {
        let instance = &mut self.instances[id.0];
        if specifier.raw() == instance.raw() {
            return false;
        }
        debug!(
            package = %instance.package_name,
            dependency = %instance.name,
            from = %instance.specifier,
            to = %specifier,
            "writing"
        );
        instance.write(specifier);
        let raw = (!instance.specifier.is_delete()).then(|| instance.raw());
        self.packages[instance.package.0].set_specifier(&instance.dependency_type, &instance.name, raw);
        true
    }

    /// Apply every fixable report, version fixes winning over semver fixes.
    /// Returns the number of changed instances per package.
    pub fn apply_fixes(&mut self, inspection: &Inspection) -> Vec<usize> {
        let mut fixes: Vec<Option<Specifier>> = vec![None; self.instances.len()];
        for report in &inspection.semver {
            if let Some(fix) = report.fix() {
                fixes[report.instance().0] = Some(fix.clone());
            }
        }
        let version_reports = inspection
            .version
            .iter()
            .flat_map(|g| g.dependencies.iter())
            .flat_map(|d| d.reports.iter());
        for report in version_reports {
            if let Some(fix) = report.fix() {
                fixes[report.instance().0] = Some(fix.clone());
            }
        }

        let mut changes = vec![0; self.packages.len()];
        for (index, fix) in fixes.into_iter().enumerate() {
            let Some(fix) = fix else {
                continue;
            };
            if self.write(InstanceId(index), fix) {
                changes[self.instances[index].package.0] += 1;
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rcfile;
    use crate::domain::{FixableKind, UnfixableKind};
    use serde_json::json;
    use std::path::Path;

    fn context(rc: serde_json::Value, files: &[(&str, &str)]) -> Context {
        let rcfile: Rcfile = serde_json::from_value(rc).unwrap();
        let config = Config::from_rcfile(Path::new("/repo"), rcfile).unwrap();
        let packages = files
            .iter()
            .map(|(path, content)| PackageJsonFile::parse(*path, content).unwrap())
            .collect();
        Context::create(config, packages)
    }

    fn version_reports<'a>(inspection: &'a Inspection, name: &str) -> Vec<&'a Report> {
        inspection
            .version
            .iter()
            .flat_map(|g| g.dependencies.iter())
            .filter(|d| d.name == name)
            .flat_map(|d| d.reports.iter())
            .collect()
    }

    #[test]
    fn test_builds_instances() {
        let ctx = context(
            json!({}),
            &[
                (
                    "/repo/package.json",
                    r#"{"name": "root", "version": "1.0.0", "devDependencies": {"a": "1.0.0"}}"#,
                ),
                (
                    "/repo/packages/b/package.json",
                    r#"{"name": "b", "dependencies": {"a": "^1.0.0", "root": "workspace:*"}}"#,
                ),
            ],
        );
        assert_eq!(ctx.instances.len(), 4);
        assert!(ctx.instances[0].is_local());
        assert_eq!(ctx.instances[2].package, PackageId(1));
        assert!(ctx.local_packages.contains("b"));
        assert_eq!(ctx.classification.version.len(), 4);
    }

    #[test]
    fn test_specifier_types_exclude_instances() {
        let ctx = context(
            json!({ "specifierTypes": ["!hosted-git"] }),
            &[(
                "/repo/package.json",
                r#"{"dependencies": {"a": "1.0.0", "b": "github:x/b"}}"#,
            )],
        );
        assert_eq!(ctx.instances.len(), 1);
        assert_eq!(ctx.instances[0].name, "a");
    }

    #[test]
    fn test_dependency_types_exclude_instances() {
        let ctx = context(
            json!({ "dependencyTypes": ["dev"] }),
            &[(
                "/repo/package.json",
                r#"{"dependencies": {"a": "1.0.0"}, "devDependencies": {"b": "1.0.0"}}"#,
            )],
        );
        assert_eq!(ctx.instances.len(), 1);
        assert_eq!(ctx.instances[0].name, "b");
    }

    #[test]
    fn test_inspect_local_package_mismatch() {
        let ctx = context(
            json!({}),
            &[
                ("/repo/package.json", r#"{"name": "foo", "version": "1.1.1"}"#),
                (
                    "/repo/packages/app/package.json",
                    r#"{"name": "app", "dependencies": {"foo": "2.2.2"}}"#,
                ),
            ],
        );
        let inspection = ctx.inspect();
        let reports = version_reports(&inspection, "foo");
        assert!(reports[0].is_valid());
        assert!(matches!(
            reports[1],
            Report::Fixable {
                kind: FixableKind::LocalPackageMismatch,
                ..
            }
        ));
        assert_eq!(reports[1].fix().unwrap().raw(), "1.1.1");
    }

    #[test]
    fn test_with_range_applies_semver_group_to_version_fix() {
        let ctx = context(
            json!({ "semverGroups": [{ "dependencyTypes": ["dev"], "range": "^" }] }),
            &[
                (
                    "/repo/a/package.json",
                    r#"{"name": "a", "dependencies": {"x": "2.0.0"}}"#,
                ),
                (
                    "/repo/b/package.json",
                    r#"{"name": "b", "devDependencies": {"x": "1.0.0"}}"#,
                ),
            ],
        );
        let inspection = ctx.inspect();
        let reports = version_reports(&inspection, "x");
        assert_eq!(reports[1].fix().unwrap().raw(), "^2.0.0");
    }

    #[test]
    fn test_apply_fixes_version_wins() {
        let mut ctx = context(
            json!({
                "semverGroups": [{ "range": "~" }],
                "versionGroups": [{ "dependencies": ["banned"], "isBanned": true }]
            }),
            &[(
                "/repo/package.json",
                r#"{"dependencies": {"banned": "1.0.0", "keep": "^1.0.0"}}"#,
            )],
        );
        let inspection = ctx.inspect();
        assert!(inspection.has_invalid());
        let changes = ctx.apply_fixes(&inspection);
        assert_eq!(changes, vec![2]);
        assert!(ctx.instances[0].specifier.is_delete());
        assert_eq!(ctx.instances[1].raw(), "~1.0.0");
        assert_eq!(
            ctx.packages[0].get("dependencies").unwrap(),
            &json!({ "keep": "~1.0.0" })
        );
    }

    #[test]
    fn test_apply_fixes_leaves_unfixable() {
        let mut ctx = context(
            json!({ "versionGroups": [{ "policy": "sameRange" }] }),
            &[
                ("/repo/a/package.json", r#"{"dependencies": {"foo": "<3.0.0"}}"#),
                ("/repo/b/package.json", r#"{"dependencies": {"foo": "~3.0.0"}}"#),
            ],
        );
        let inspection = ctx.inspect();
        assert!(inspection.has_unfixable());
        assert!(version_reports(&inspection, "foo").iter().all(|r| matches!(
            r,
            Report::Unfixable {
                kind: UnfixableKind::SameRangeMismatch { .. },
                ..
            }
        )));
        assert_eq!(ctx.apply_fixes(&inspection), vec![0, 0]);
        assert!(ctx.packages.iter().all(|p| !p.has_changed()));
    }

    /// Fix once, reload the written files and inspect them again
    fn fix_and_reinspect(rc: serde_json::Value, files: &[(&str, &str)]) -> Inspection {
        let mut ctx = context(rc.clone(), files);
        let inspection = ctx.inspect();
        ctx.apply_fixes(&inspection);

        let fixed: Vec<(String, String)> = ctx
            .packages
            .iter()
            .map(|p| (p.path.display().to_string(), p.serialize().unwrap()))
            .collect();
        let refs: Vec<(&str, &str)> = fixed.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
        context(rc, &refs).inspect()
    }

    #[test]
    fn test_fix_is_idempotent() {
        let files = [
            (
                "/repo/a/package.json",
                r#"{"name": "a", "dependencies": {"x": "1.0.0", "y": "0.2.0"}}"#,
            ),
            (
                "/repo/b/package.json",
                r#"{"name": "b", "devDependencies": {"x": "2.0.0", "y": "*"}}"#,
            ),
        ];
        let rc = json!({ "semverGroups": [{ "dependencyTypes": ["prod"], "range": "^" }] });
        assert!(!fix_and_reinspect(rc, &files).has_invalid());
    }

    #[test]
    fn test_fix_is_idempotent_when_raws_already_agree() {
        let files = [
            ("/repo/a/package.json", r#"{"name": "a", "dependencies": {"x": "1.0.0"}}"#),
            ("/repo/b/package.json", r#"{"name": "b", "dependencies": {"x": "1.0.0"}}"#),
        ];
        let rc = json!({ "semverGroups": [{ "packages": ["a"], "range": "^" }] });
        assert!(context(rc.clone(), &files).inspect().has_invalid());
        assert!(!fix_and_reinspect(rc, &files).has_invalid());
    }

    #[test]
    fn test_fix_is_idempotent_with_ranged_snap_source() {
        let files = [
            (
                "/repo/app/package.json",
                r#"{"name": "app", "dependencies": {"react": "18.0.0"}}"#,
            ),
            (
                "/repo/lib/package.json",
                r#"{"name": "lib", "dependencies": {"react": "18.0.0"}}"#,
            ),
        ];
        let rc = json!({
            "semverGroups": [{ "packages": ["app"], "range": "^" }],
            "versionGroups": [{ "dependencies": ["react"], "snapTo": ["app"] }]
        });
        let second = fix_and_reinspect(rc, &files);
        assert!(!second.has_invalid());
        assert!(version_reports(&second, "react").iter().all(|r| r.is_valid()));
    }
}
