//! Orchestrator for lint, list, fix and update runs
//!
//! Coordinates the whole flow:
//! 1. Load and validate the config
//! 2. Detect and read package.json files
//! 3. Build the context and inspect every instance
//! 4. Apply fixes or registry updates
//! 5. Write changed manifests (or not, in dry-run mode)

use crate::cli::{CliArgs, Command, UpdateArgs};
use crate::config::Config;
use crate::context::{Context, Inspection};
use crate::domain::{ManifestResult, RunSummary};
use crate::error::AppError;
use crate::manifest::{self, detect_manifests, ManifestWriter};
use crate::output::{build_views, GroupView};
use crate::progress::Progress;
use crate::registry::{HttpClient, NpmAdapter, RegistryAdapter};
use crate::update::{
    apply_updates, collect_candidates, fetch_all, ProposedUpdate, SkipReason, UpdateJudge,
    UpdateOutcome, DEFAULT_CONCURRENCY,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which command produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Lint,
    List,
    Fix,
    Update,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Lint => "lint",
            RunKind::List => "list",
            RunKind::Fix => "fix",
            RunKind::Update => "update",
        }
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct OrchestratorResult {
    pub kind: RunKind,
    /// Reports as they were before any fix
    pub groups: Vec<GroupView>,
    pub summary: RunSummary,
    /// Newer registry versions found by `update`
    pub updates: Vec<ProposedUpdate>,
    /// Dependencies `update` left alone
    pub skipped: Vec<(String, SkipReason)>,
    /// Errors which did not stop the run
    pub errors: Vec<OrchestratorError>,
}

impl OrchestratorResult {
    fn new(kind: RunKind, groups: Vec<GroupView>, summary: RunSummary) -> Self {
        Self {
            kind,
            groups,
            summary,
            updates: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// 0 on success. 1 when `lint`/`list` found mismatches, when `fix` left
    /// unfixable ones behind, or when a manifest could not be written.
    pub fn exit_code(&self) -> u8 {
        let failed = match self.kind {
            RunKind::Lint | RunKind::List => self.summary.has_invalid(),
            RunKind::Fix => self.summary.unfixable > 0,
            RunKind::Update => false,
        };
        u8::from(failed || !self.errors.is_empty())
    }
}

/// Errors that don't abort a run
#[derive(Debug)]
pub enum OrchestratorError {
    WriteError { path: String, message: String },
}

impl std::fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorError::WriteError { path, message } => {
                write!(f, "failed to write {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for OrchestratorError {}

/// Asked before registry updates are written
pub type Confirm<'a> = &'a mut dyn FnMut(&[ProposedUpdate]) -> bool;

pub struct Orchestrator {
    args: CliArgs,
    registry: Option<Arc<dyn RegistryAdapter>>,
}

impl Orchestrator {
    /// The npm registry client is only built for `update`
    pub fn new(args: CliArgs) -> Result<Self, AppError> {
        let registry = match &args.command {
            Command::Update(update) => {
                let adapter = NpmAdapter::new(HttpClient::new()?);
                let adapter = match &update.registry {
                    Some(url) => adapter.with_base_url(url),
                    None => adapter,
                };
                Some(Arc::new(adapter) as Arc<dyn RegistryAdapter>)
            }
            _ => None,
        };
        Ok(Self { args, registry })
    }

    /// Use another registry adapter
    pub fn with_registry(mut self, registry: Arc<dyn RegistryAdapter>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn kind(&self) -> RunKind {
        match self.args.command {
            Command::Lint(_) => RunKind::Lint,
            Command::List(_) => RunKind::List,
            Command::Fix(_) => RunKind::Fix,
            Command::Update(_) => RunKind::Update,
        }
    }

    fn show_progress(&self) -> bool {
        let common = self.args.common();
        !common.quiet && !common.json
    }

    /// Run the command. Config and manifest read errors abort the run;
    /// write errors are collected into the result.
    pub async fn run(&self, confirm: Confirm<'_>) -> Result<OrchestratorResult, AppError> {
        let mut progress = Progress::new(self.show_progress());
        let common = self.args.common();

        let config = Config::load(&common.path, common.config.as_deref(), &common.overrides())?;

        progress.spinner("Reading manifests...");
        let paths = detect_manifests(&common.path, &config.source)?;
        if paths.is_empty() {
            warn!(root = %common.path.display(), "no package.json files found");
        }
        let packages = manifest::read_all(&paths)?;
        progress.finish_and_clear();
        info!(manifests = packages.len(), "read manifests");

        let mut context = Context::create(config, packages);
        let inspection = context.inspect();
        let groups = build_views(&context, &inspection);
        debug!(groups = groups.len(), "inspected");

        match &self.args.command {
            Command::Lint(_) | Command::List(_) => Ok(OrchestratorResult::new(
                self.kind(),
                groups,
                RunSummary::from_reports(inspection.reports(), false),
            )),
            Command::Fix(fix) => Ok(self.fix(&mut context, &inspection, groups, fix.dry_run)),
            Command::Update(update) => {
                let mut result =
                    OrchestratorResult::new(RunKind::Update, groups, RunSummary::new(update.dry_run));
                self.update(&context, update, &mut result, &mut progress).await;

                if result.updates.is_empty() {
                    return Ok(result);
                }
                let accepted = update.dry_run || update.yes || confirm(&result.updates);
                if !accepted {
                    info!("updates declined, nothing written");
                    return Ok(result);
                }
                let changes = apply_updates(&mut context, &result.updates);
                write(&context, &changes, update.dry_run, &mut result);
                Ok(result)
            }
        }
    }

    fn fix(
        &self,
        context: &mut Context,
        inspection: &Inspection,
        groups: Vec<GroupView>,
        dry_run: bool,
    ) -> OrchestratorResult {
        let summary = RunSummary::from_reports(inspection.reports(), dry_run);
        let mut result = OrchestratorResult::new(RunKind::Fix, groups, summary);
        let changes = context.apply_fixes(inspection);
        write(context, &changes, dry_run, &mut result);
        result
    }

    /// Fetch and judge every candidate, filling `updates` and `skipped`
    async fn update(
        &self,
        context: &Context,
        args: &UpdateArgs,
        result: &mut OrchestratorResult,
        progress: &mut Progress,
    ) {
        let Some(registry) = &self.registry else {
            return;
        };
        let filter = args.filter();
        let candidates = collect_candidates(context, &filter);
        info!(candidates = candidates.len(), registry = registry.registry_name(), "checking for updates");

        let names = candidates.iter().map(|c| c.name.clone()).collect();
        progress.start(candidates.len() as u64, "Fetching versions");
        let fetched = {
            let progress = &*progress;
            fetch_all(Arc::clone(registry), names, DEFAULT_CONCURRENCY, |name| {
                progress.inc(name)
            })
            .await
        };
        progress.finish_and_clear();

        let judge = UpdateJudge::new(filter);
        for outcome in judge.judge_all(&candidates, fetched) {
            match outcome {
                UpdateOutcome::Update(update) => result.updates.push(update),
                UpdateOutcome::Skip { name, reason } => {
                    debug!(name = %name, ?reason, "not updating");
                    result.skipped.push((name, reason));
                }
            }
        }
    }
}

/// Write every changed manifest and record the outcome in `result`
fn write(context: &Context, changes: &[usize], dry_run: bool, result: &mut OrchestratorResult) {
    let changes_by_path: HashMap<&Path, usize> = context
        .packages
        .iter()
        .zip(changes)
        .map(|(package, count)| (package.path.as_path(), *count))
        .collect();

    let writer = ManifestWriter::new(dry_run);
    for written in writer.write_all(&context.packages) {
        let mut manifest = ManifestResult::new(&written.path);
        manifest.changes = changes_by_path.get(written.path.as_path()).copied().unwrap_or(0);
        manifest.modified = written.changed && !written.has_errors();
        if let Some(message) = written.errors.first() {
            manifest.error = Some(message.clone());
            result.errors.push(OrchestratorError::WriteError {
                path: written.path.display().to_string(),
                message: message.clone(),
            });
        }
        result.summary.add_manifest(manifest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::registry::PackageVersions;
    use crate::update::VersionInfo;
    use async_trait::async_trait;
    use chrono::Utc;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    struct FakeRegistry;

    #[async_trait]
    impl RegistryAdapter for FakeRegistry {
        fn registry_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_versions(&self, package: &str) -> Result<PackageVersions, RegistryError> {
            match package {
                "react" => Ok(PackageVersions {
                    name: package.to_string(),
                    latest: Some("18.2.0".to_string()),
                    versions: vec![
                        VersionInfo::new("17.0.2", Utc::now() - chrono::Duration::days(900)),
                        VersionInfo::new("18.2.0", Utc::now() - chrono::Duration::days(400)),
                    ],
                }),
                _ => Err(RegistryError::package_not_found(package, "fake")),
            }
        }
    }

    fn repo(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn monorepo() -> TempDir {
        repo(&[
            (
                "package.json",
                r#"{"name": "root", "private": true, "workspaces": ["packages/*"]}"#,
            ),
            (
                "packages/a/package.json",
                "{\n  \"name\": \"a\",\n  \"dependencies\": {\n    \"react\": \"17.0.2\",\n    \"left-pad\": \"1.0.0\"\n  }\n}\n",
            ),
            (
                "packages/b/package.json",
                "{\n  \"name\": \"b\",\n  \"dependencies\": {\n    \"react\": \"^17.0.0\"\n  }\n}\n",
            ),
        ])
    }

    async fn run(args: &[&str], dir: &TempDir, confirm: bool) -> OrchestratorResult {
        let mut argv = vec!["depsync"];
        argv.extend_from_slice(args);
        let path = dir.path().to_str().unwrap();
        argv.push(path);
        let orchestrator = Orchestrator::new(CliArgs::parse_from(argv))
            .unwrap()
            .with_registry(Arc::new(FakeRegistry));
        orchestrator.run(&mut |_| confirm).await.unwrap()
    }

    #[tokio::test]
    async fn test_lint_reports_mismatch() {
        let dir = monorepo();
        let result = run(&["lint", "-q"], &dir, false).await;
        assert_eq!(result.kind, RunKind::Lint);
        assert!(result.summary.has_invalid());
        assert_eq!(result.exit_code(), 1);
        assert!(result.summary.manifests.is_empty());
    }

    #[tokio::test]
    async fn test_lint_clean_repo() {
        let dir = repo(&[("package.json", r#"{"dependencies": {"react": "18.0.0"}}"#)]);
        let result = run(&["lint"], &dir, false).await;
        assert_eq!(result.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_fix_writes_files() {
        let dir = monorepo();
        let result = run(&["fix", "-q"], &dir, false).await;
        assert_eq!(result.exit_code(), 0);
        assert_eq!(result.summary.files_modified(), 1);
        assert_eq!(result.summary.total_changes(), 1);
        let b = fs::read_to_string(dir.path().join("packages/b/package.json")).unwrap();
        assert!(b.contains("\"react\": \"17.0.2\""));
    }

    #[tokio::test]
    async fn test_fix_dry_run_writes_nothing() {
        let dir = monorepo();
        let before = fs::read_to_string(dir.path().join("packages/b/package.json")).unwrap();
        let result = run(&["fix", "--dry-run", "-q"], &dir, false).await;
        assert!(result.summary.dry_run);
        assert_eq!(result.summary.files_modified(), 1);
        let after = fs::read_to_string(dir.path().join("packages/b/package.json")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_invalid_config_aborts() {
        let dir = monorepo();
        fs::write(dir.path().join(".depsyncrc.json"), r#"{"filter": "("}"#).unwrap();
        let orchestrator =
            Orchestrator::new(CliArgs::parse_from(["depsync", "lint", dir.path().to_str().unwrap()]))
                .unwrap();
        let err = orchestrator.run(&mut |_| false).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_update_declined_writes_nothing() {
        let dir = monorepo();
        let result = run(&["update", "-q"], &dir, false).await;
        assert_eq!(result.updates.len(), 1);
        assert_eq!(result.updates[0].latest, "18.2.0");
        assert!(result
            .skipped
            .iter()
            .any(|(name, reason)| name == "left-pad" && matches!(reason, SkipReason::FetchFailed(_))));
        assert!(result.summary.manifests.is_empty());
        let a = fs::read_to_string(dir.path().join("packages/a/package.json")).unwrap();
        assert!(a.contains("\"react\": \"17.0.2\""));
    }

    #[tokio::test]
    async fn test_update_accepted_keeps_ranges() {
        let dir = monorepo();
        let result = run(&["update", "-q"], &dir, true).await;
        assert_eq!(result.exit_code(), 0);
        assert_eq!(result.summary.files_modified(), 2);
        let a = fs::read_to_string(dir.path().join("packages/a/package.json")).unwrap();
        let b = fs::read_to_string(dir.path().join("packages/b/package.json")).unwrap();
        assert!(a.contains("\"react\": \"18.2.0\""));
        assert!(b.contains("\"react\": \"^18.2.0\""));
    }

    #[test]
    fn test_exit_code() {
        let mut result = OrchestratorResult::new(RunKind::Fix, Vec::new(), RunSummary::new(false));
        assert_eq!(result.exit_code(), 0);
        result.summary.fixable = 3;
        assert_eq!(result.exit_code(), 0);
        result.summary.unfixable = 1;
        assert_eq!(result.exit_code(), 1);

        let mut result = OrchestratorResult::new(RunKind::Update, Vec::new(), RunSummary::new(false));
        result.errors.push(OrchestratorError::WriteError {
            path: "package.json".to_string(),
            message: "denied".to_string(),
        });
        assert_eq!(result.exit_code(), 1);
    }
}
