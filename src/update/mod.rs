//! The `update` workflow: look up newer releases on the registry
//!
//! This module provides:
//! - Update filter configuration from CLI args
//! - Version info from registry with release date
//! - Candidate collection from the run context
//! - Bounded-concurrency registry lookups
//! - Update judgment engine that decides whether to update or skip

mod filter;
mod version_info;

pub use filter::UpdateFilter;
pub use version_info::{compare_versions, is_prerelease_version, VersionInfo};

use crate::context::Context;
use crate::domain::{Instance, InstanceId};
use crate::error::RegistryError;
use crate::group::VersionPolicy;
use crate::registry::{PackageVersions, RegistryAdapter};
use crate::specifier::{get_highest, SemverRange, Variant};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, warn};

/// Registry requests in flight at once
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Why a dependency is left as it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyLatest,
    /// Every release is filtered out (prerelease, too young)
    NoSuitableVersion,
    FetchFailed(String),
}

/// One dependency name and the highest version currently declared for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub name: String,
    pub current: String,
    pub instances: Vec<InstanceId>,
}

/// A newer release the user is asked to accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposedUpdate {
    pub name: String,
    pub current: String,
    pub latest: String,
    pub released_at: DateTime<Utc>,
    #[serde(skip)]
    pub instances: Vec<InstanceId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Update(ProposedUpdate),
    Skip { name: String, reason: SkipReason },
}

/// Exact and plain-range specifiers of third-party dependencies whose
/// version group lets them move
fn is_updatable(context: &Context, instance: &Instance) -> bool {
    if instance.is_local() || context.local_packages.contains(&instance.name) {
        return false;
    }
    if !matches!(instance.specifier.variant(), Variant::Exact | Variant::Range) {
        return false;
    }
    let group = &context.config.version_groups[context.classification.version[instance.id.0]];
    matches!(
        group.policy,
        VersionPolicy::Standard { .. } | VersionPolicy::SameRange
    )
}

/// Every updatable dependency name, once, in name order
pub fn collect_candidates(context: &Context, filter: &UpdateFilter) -> Vec<UpdateCandidate> {
    let mut by_name: BTreeMap<&str, Vec<&Instance>> = BTreeMap::new();
    for instance in &context.instances {
        if is_updatable(context, instance) && filter.should_process_package(&instance.name) {
            by_name.entry(&instance.name).or_default().push(instance);
        }
    }

    by_name
        .into_iter()
        .filter_map(|(name, instances)| {
            let specifiers: Vec<_> = instances.iter().map(|i| &i.specifier).collect();
            let highest = get_highest(&specifiers).ok().flatten()?;
            Some(UpdateCandidate {
                name: name.to_string(),
                current: highest.get_semver().ok()?.to_string(),
                instances: instances.iter().map(|i| i.id).collect(),
            })
        })
        .collect()
}

/// Fetch every name, at most `concurrency` requests at a time.
/// Results come back in the order of `names`.
pub async fn fetch_all(
    adapter: Arc<dyn RegistryAdapter>,
    names: Vec<String>,
    concurrency: usize,
    on_done: impl Fn(&str),
) -> Vec<(String, Result<PackageVersions, RegistryError>)> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let registry = adapter.registry_name();
    let mut tasks = JoinSet::new();
    let mut spawned: HashMap<task::Id, (usize, String)> = HashMap::new();

    for (index, name) in names.into_iter().enumerate() {
        let adapter = Arc::clone(&adapter);
        let semaphore = Arc::clone(&semaphore);
        let task_name = name.clone();
        let handle = tasks.spawn(async move {
            match semaphore.acquire_owned().await {
                Ok(_permit) => adapter.fetch_versions(&task_name).await,
                Err(e) => Err(RegistryError::network_error(&task_name, registry, e.to_string())),
            }
        });
        spawned.insert(handle.id(), (index, name));
    }

    let mut results = Vec::with_capacity(spawned.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, joined) = match joined {
            Ok((id, result)) => (id, Ok(result)),
            Err(e) => (e.id(), Err(e)),
        };
        let Some((index, name)) = spawned.remove(&id) else {
            continue;
        };
        let result = joined.unwrap_or_else(|e| {
            warn!(package = %name, "registry task failed: {}", e);
            Err(RegistryError::network_error(&name, registry, format!("task failed: {}", e)))
        });
        on_done(&name);
        results.push((index, name, result));
    }
    results.sort_by_key(|(index, _, _)| *index);
    results
        .into_iter()
        .map(|(_, name, result)| (name, result))
        .collect()
}

/// Update judgment engine that decides whether to update a dependency
pub struct UpdateJudge {
    filter: UpdateFilter,
    /// Current time for age calculations
    now: DateTime<Utc>,
}

impl UpdateJudge {
    pub fn new(filter: UpdateFilter) -> Self {
        Self {
            filter,
            now: Utc::now(),
        }
    }

    /// Create a new UpdateJudge with a custom current time (for testing)
    pub fn with_time(filter: UpdateFilter, now: DateTime<Utc>) -> Self {
        Self { filter, now }
    }

    /// The newest acceptable release above `candidate.current`
    pub fn judge(&self, candidate: &UpdateCandidate, available: &PackageVersions) -> UpdateOutcome {
        let skip = |reason| UpdateOutcome::Skip {
            name: candidate.name.clone(),
            reason,
        };

        // Stable projects only move to stable releases, and never past the
        // `latest` dist-tag
        let allow_prerelease =
            self.filter.include_prerelease || is_prerelease_version(&candidate.current);
        let cap = available.latest.as_deref().filter(|_| !allow_prerelease);

        let cutoff = match self.filter.min_age {
            None => None,
            Some(age) => match chrono::Duration::from_std(age)
                .ok()
                .and_then(|age| self.now.checked_sub_signed(age))
            {
                Some(cutoff) => Some(cutoff),
                None => return skip(SkipReason::NoSuitableVersion),
            },
        };

        let latest = available
            .versions
            .iter()
            .filter(|v| allow_prerelease || !v.is_prerelease())
            .filter(|v| cap.is_none_or(|cap| compare_versions(&v.version, cap).is_le()))
            .filter(|v| cutoff.is_none_or(|cutoff| v.released_at <= cutoff))
            .max();

        let Some(latest) = latest else {
            return skip(SkipReason::NoSuitableVersion);
        };
        if compare_versions(&candidate.current, &latest.version).is_ge() {
            return skip(SkipReason::AlreadyLatest);
        }

        UpdateOutcome::Update(ProposedUpdate {
            name: candidate.name.clone(),
            current: candidate.current.clone(),
            latest: latest.version.clone(),
            released_at: latest.released_at,
            instances: candidate.instances.clone(),
        })
    }

    /// Judge every fetched candidate; failed lookups are logged and skipped
    pub fn judge_all(
        &self,
        candidates: &[UpdateCandidate],
        fetched: Vec<(String, Result<PackageVersions, RegistryError>)>,
    ) -> Vec<UpdateOutcome> {
        candidates
            .iter()
            .zip(fetched)
            .map(|(candidate, (_, result))| match result {
                Ok(available) => self.judge(candidate, &available),
                Err(e) => {
                    warn!("{}", e);
                    UpdateOutcome::Skip {
                        name: candidate.name.clone(),
                        reason: SkipReason::FetchFailed(e.to_string()),
                    }
                }
            })
            .collect()
    }
}

/// Write accepted updates into the context, keeping each instance's range
/// shape. Returns the number of changed instances per package.
pub fn apply_updates(context: &mut Context, updates: &[ProposedUpdate]) -> Vec<usize> {
    let mut changes = vec![0; context.packages.len()];
    for update in updates {
        for &id in &update.instances {
            let instance = context.instance(id);
            let Ok(semver) = instance.specifier.get_semver() else {
                continue;
            };
            let next = SemverRange::detect(semver).apply(&update.latest);
            let Ok(specifier) = instance.specifier.set_semver(&next) else {
                continue;
            };
            let package = instance.package;
            if context.write(id, specifier) {
                changes[package.0] += 1;
            }
        }
        debug!(name = %update.name, latest = %update.latest, "applied update");
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Rcfile};
    use crate::manifest::PackageJsonFile;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        fixed_time() - chrono::Duration::days(days)
    }

    fn available(latest: Option<&str>, versions: &[(&str, i64)]) -> PackageVersions {
        PackageVersions {
            name: "pkg".to_string(),
            latest: latest.map(str::to_string),
            versions: versions
                .iter()
                .map(|(v, days)| VersionInfo::new(*v, days_ago(*days)))
                .collect(),
        }
    }

    fn candidate(current: &str) -> UpdateCandidate {
        UpdateCandidate {
            name: "pkg".to_string(),
            current: current.to_string(),
            instances: vec![InstanceId(0)],
        }
    }

    fn context(rc: serde_json::Value, files: &[(&str, &str)]) -> Context {
        let rcfile: Rcfile = serde_json::from_value(rc).unwrap();
        let config = Config::from_rcfile(Path::new("/repo"), rcfile).unwrap();
        let packages = files
            .iter()
            .map(|(path, content)| PackageJsonFile::parse(*path, content).unwrap())
            .collect();
        Context::create(config, packages)
    }

    #[derive(Default)]
    struct FakeRegistry {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RegistryAdapter for FakeRegistry {
        fn registry_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_versions(&self, package: &str) -> Result<PackageVersions, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if package == "panics" {
                panic!("adapter blew up");
            }
            if package == "missing" {
                return Err(RegistryError::package_not_found(package, "fake"));
            }
            Ok(PackageVersions {
                name: package.to_string(),
                latest: Some("2.0.0".to_string()),
                versions: vec![VersionInfo::new("2.0.0", days_ago(30))],
            })
        }
    }

    #[test]
    fn test_judge_simple_update() {
        let judge = UpdateJudge::with_time(UpdateFilter::new(), fixed_time());
        let versions = available(Some("2.0.0"), &[("1.0.0", 100), ("1.1.0", 50), ("2.0.0", 10)]);
        match judge.judge(&candidate("^1.0.0"), &versions) {
            UpdateOutcome::Update(update) => {
                assert_eq!(update.latest, "2.0.0");
                assert_eq!(update.current, "^1.0.0");
                assert_eq!(update.released_at, days_ago(10));
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_judge_already_latest() {
        let judge = UpdateJudge::with_time(UpdateFilter::new(), fixed_time());
        let versions = available(None, &[("1.0.0", 100), ("2.0.0", 10)]);
        let outcome = judge.judge(&candidate("2.0.0"), &versions);
        assert!(matches!(
            outcome,
            UpdateOutcome::Skip {
                reason: SkipReason::AlreadyLatest,
                ..
            }
        ));
    }

    #[test]
    fn test_judge_never_downgrades() {
        let judge = UpdateJudge::with_time(UpdateFilter::new(), fixed_time());
        let versions = available(None, &[("1.0.0", 100)]);
        let outcome = judge.judge(&candidate("3.0.0"), &versions);
        assert!(matches!(
            outcome,
            UpdateOutcome::Skip {
                reason: SkipReason::AlreadyLatest,
                ..
            }
        ));
    }

    #[test]
    fn test_judge_skips_prereleases_and_respects_latest_tag() {
        let judge = UpdateJudge::with_time(UpdateFilter::new(), fixed_time());
        let versions = available(
            Some("1.5.0"),
            &[("1.0.0", 100), ("1.5.0", 50), ("2.0.0-rc.1", 5), ("1.6.0", 1)],
        );
        match judge.judge(&candidate("1.0.0"), &versions) {
            UpdateOutcome::Update(update) => assert_eq!(update.latest, "1.5.0"),
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_judge_prerelease_allowed() {
        let versions = available(Some("1.0.0"), &[("1.0.0", 100), ("2.0.0-rc.1", 5)]);

        let judge = UpdateJudge::with_time(UpdateFilter::new().with_include_prerelease(true), fixed_time());
        match judge.judge(&candidate("1.0.0"), &versions) {
            UpdateOutcome::Update(update) => assert_eq!(update.latest, "2.0.0-rc.1"),
            other => panic!("expected update, got {:?}", other),
        }

        // already on a prerelease line
        let judge = UpdateJudge::with_time(UpdateFilter::new(), fixed_time());
        match judge.judge(&candidate("2.0.0-beta.1"), &versions) {
            UpdateOutcome::Update(update) => assert_eq!(update.latest, "2.0.0-rc.1"),
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_judge_min_age() {
        let filter = UpdateFilter::new().with_min_age(Duration::from_secs(7 * 86400));
        let judge = UpdateJudge::with_time(filter, fixed_time());
        let versions = available(None, &[("1.0.0", 100), ("1.1.0", 30), ("1.2.0", 3)]);
        match judge.judge(&candidate("1.0.0"), &versions) {
            UpdateOutcome::Update(update) => assert_eq!(update.latest, "1.1.0"),
            other => panic!("expected update, got {:?}", other),
        }

        let too_young = available(None, &[("1.2.0", 3)]);
        assert!(matches!(
            judge.judge(&candidate("1.0.0"), &too_young),
            UpdateOutcome::Skip {
                reason: SkipReason::NoSuitableVersion,
                ..
            }
        ));
    }

    #[test]
    fn test_collect_candidates() {
        let ctx = context(
            json!({ "versionGroups": [{ "dependencies": ["pinned"], "pinVersion": "1.0.0" }] }),
            &[
                (
                    "/repo/a/package.json",
                    r#"{"name": "a", "version": "1.0.0", "dependencies": {"react": "^17.0.0", "b": "1.0.0", "pinned": "1.0.0", "git": "github:x/y"}}"#,
                ),
                (
                    "/repo/b/package.json",
                    r#"{"name": "b", "devDependencies": {"react": "17.0.2", "lodash": "*"}}"#,
                ),
            ],
        );
        let candidates = collect_candidates(&ctx, &UpdateFilter::new());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "react");
        assert_eq!(candidates[0].current, "17.0.2");
        assert_eq!(candidates[0].instances.len(), 2);

        let excluded = collect_candidates(&ctx, &UpdateFilter::new().with_exclude(vec!["react".to_string()]));
        assert!(excluded.is_empty());
    }

    #[test]
    fn test_apply_updates_keeps_range() {
        let mut ctx = context(
            json!({}),
            &[
                ("/repo/a/package.json", r#"{"dependencies": {"react": "^17.0.0"}}"#),
                ("/repo/b/package.json", r#"{"dependencies": {"react": "~17.0.2"}}"#),
            ],
        );
        let candidates = collect_candidates(&ctx, &UpdateFilter::new());
        let update = ProposedUpdate {
            name: "react".to_string(),
            current: candidates[0].current.clone(),
            latest: "18.2.0".to_string(),
            released_at: fixed_time(),
            instances: candidates[0].instances.clone(),
        };
        assert_eq!(apply_updates(&mut ctx, &[update]), vec![1, 1]);
        assert_eq!(ctx.instances[0].raw(), "^18.2.0");
        assert_eq!(ctx.instances[1].raw(), "~18.2.0");
        assert!(ctx.packages.iter().all(PackageJsonFile::has_changed));
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_order() {
        let registry = Arc::new(FakeRegistry::default());
        let names: Vec<String> = ["a", "missing", "c"].iter().map(|s| s.to_string()).collect();
        let done = AtomicUsize::new(0);
        let results = fetch_all(registry.clone(), names, 2, |_| {
            done.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(registry.calls.load(Ordering::SeqCst), 3);
        assert_eq!(done.load(Ordering::SeqCst), 3);
        let order: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(order, vec!["a", "missing", "c"]);
        assert!(results[0].1.is_ok());
        assert!(matches!(
            results[1].1,
            Err(RegistryError::PackageNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_all_bounds_requests_in_flight() {
        let registry = Arc::new(FakeRegistry::default());
        let names: Vec<String> = (0..12).map(|i| format!("pkg-{}", i)).collect();
        let results = fetch_all(registry.clone(), names, 3, |_| {}).await;

        assert_eq!(results.len(), 12);
        assert_eq!(registry.calls.load(Ordering::SeqCst), 12);
        let peak = registry.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "{} requests in flight", peak);
        assert!(peak > 1);
    }

    #[tokio::test]
    async fn test_fetch_all_reports_failed_task() {
        let registry = Arc::new(FakeRegistry::default());
        let names: Vec<String> = ["a", "panics", "c"].iter().map(|s| s.to_string()).collect();
        let results = fetch_all(registry, names, 2, |_| {}).await;

        let order: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(order, vec!["a", "panics", "c"]);
        assert!(matches!(
            &results[1].1,
            Err(RegistryError::NetworkError { package, .. }) if package == "panics"
        ));

        let judge = UpdateJudge::with_time(UpdateFilter::new(), fixed_time());
        let candidates: Vec<UpdateCandidate> = ["a", "panics", "c"]
            .iter()
            .map(|name| UpdateCandidate {
                name: name.to_string(),
                ..candidate("1.0.0")
            })
            .collect();
        let outcomes = judge.judge_all(&candidates, results);
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(
            &outcomes[1],
            UpdateOutcome::Skip { name, reason: SkipReason::FetchFailed(_) } if name == "panics"
        ));
        assert!(!matches!(&outcomes[2], UpdateOutcome::Skip { reason: SkipReason::FetchFailed(_), .. }));
    }

    #[test]
    fn test_judge_all_skips_failures() {
        let judge = UpdateJudge::with_time(UpdateFilter::new(), fixed_time());
        let candidates = vec![candidate("1.0.0")];
        let fetched = vec![(
            "pkg".to_string(),
            Err(RegistryError::timeout("pkg", "npm")),
        )];
        let outcomes = judge.judge_all(&candidates, fetched);
        assert!(matches!(
            &outcomes[0],
            UpdateOutcome::Skip {
                reason: SkipReason::FetchFailed(_),
                ..
            }
        ));
    }
}
