//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of every report, grouped like the text output
//! - Proposed registry updates
//! - Manifest write results and errors

use crate::domain::{ManifestResult, Report, RunSummary, UnfixableKind};
use crate::orchestrator::{OrchestratorResult, RunKind};
use crate::output::{DependencyView, GroupView, InstanceView, OutputFormatter, Verbosity};
use crate::update::ProposedUpdate;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbose output keeps valid dependencies in `lint`
    verbosity: Verbosity,
}

impl JsonFormatter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    command: &'static str,
    dry_run: bool,
    summary: JsonSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    groups: Vec<JsonGroup<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updates: Option<&'a [ProposedUpdate]>,
    #[serde(skip_serializing_if = "is_empty")]
    manifests: &'a [ManifestResult],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary {
    valid: usize,
    fixable: usize,
    unfixable: usize,
    files_modified: usize,
    changes: usize,
}

#[derive(Serialize)]
struct JsonGroup<'a> {
    label: &'a str,
    dependencies: Vec<JsonDependency<'a>>,
}

#[derive(Serialize)]
struct JsonDependency<'a> {
    name: &'a str,
    valid: bool,
    instances: Vec<JsonInstance<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonInstance<'a> {
    package: &'a str,
    dependency_type: &'a str,
    specifier: &'a str,
    version: JsonReport,
    semver: JsonReport,
}

#[derive(Serialize)]
struct JsonReport {
    /// valid, fixable or unfixable
    status: &'static str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mismatches: Vec<String>,
}

impl From<&Report> for JsonReport {
    fn from(report: &Report) -> Self {
        let status = match report {
            Report::Valid { .. } => "valid",
            Report::Fixable { .. } => "fixable",
            Report::Unfixable { .. } => "unfixable",
        };
        let mismatches = match report {
            Report::Unfixable {
                kind: UnfixableKind::SameRangeMismatch { mismatches },
                ..
            } => mismatches.clone(),
            _ => Vec::new(),
        };
        Self {
            status,
            kind: report.name(),
            // a removal has no replacement text
            fix: report
                .fix()
                .filter(|fix| !fix.is_delete())
                .map(|fix| fix.raw().to_string()),
            mismatches,
        }
    }
}

impl JsonFormatter {
    fn summary(summary: &RunSummary) -> JsonSummary {
        JsonSummary {
            valid: summary.valid,
            fixable: summary.fixable,
            unfixable: summary.unfixable,
            files_modified: summary.files_modified(),
            changes: summary.total_changes(),
        }
    }

    fn instance(instance: &InstanceView) -> JsonInstance<'_> {
        JsonInstance {
            package: &instance.package,
            dependency_type: &instance.dependency_type,
            specifier: &instance.raw,
            version: JsonReport::from(&instance.version),
            semver: JsonReport::from(&instance.semver),
        }
    }

    fn groups<'a>(&self, kind: RunKind, groups: &'a [GroupView]) -> Vec<JsonGroup<'a>> {
        let keep_valid = kind == RunKind::List || self.verbosity == Verbosity::Verbose;
        groups
            .iter()
            .map(|group| JsonGroup {
                label: &group.label,
                dependencies: group
                    .dependencies
                    .iter()
                    .filter(|d| keep_valid || !d.is_valid())
                    .map(|d: &DependencyView| JsonDependency {
                        name: &d.name,
                        valid: d.is_valid(),
                        instances: d.instances.iter().map(Self::instance).collect(),
                    })
                    .collect(),
            })
            .filter(|group| !group.dependencies.is_empty())
            .collect()
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            command: result.kind.as_str(),
            dry_run: result.summary.dry_run,
            summary: Self::summary(&result.summary),
            groups: self.groups(result.kind, &result.groups),
            updates: (result.kind == RunKind::Update).then_some(result.updates.as_slice()),
            manifests: &result.summary.manifests,
            errors: result.errors.iter().map(|e| e.to_string()).collect(),
        };

        let json = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }

    fn format_summary(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let json =
            serde_json::to_string_pretty(&Self::summary(summary)).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}
