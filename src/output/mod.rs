//! Output formatting for reports
//!
//! This module provides:
//! - Display views of the reports, grouped by version group and dependency
//! - Text output for human-readable display
//! - JSON output for machine processing

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::context::{Context, Inspection};
use crate::domain::{Report, RunSummary};
use crate::orchestrator::OrchestratorResult;
use std::io::{IsTerminal, Write};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for machine processing
    Json,
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Summary only
    Quiet,
    #[default]
    Normal,
    /// Valid dependencies and skipped updates too
    Verbose,
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbosity: Verbosity,
    pub dry_run: bool,
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            verbosity: Verbosity::default(),
            dry_run: false,
            color: true,
        }
    }
}

impl OutputConfig {
    pub fn new(format: OutputFormat, verbosity: Verbosity, dry_run: bool) -> Self {
        Self {
            format,
            verbosity,
            dry_run,
            color: true,
        }
    }

    /// Create configuration from CLI arguments. Colors only on a terminal.
    pub fn from_cli(json: bool, verbose: bool, quiet: bool, dry_run: bool) -> Self {
        let format = if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };

        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        Self {
            format,
            verbosity,
            dry_run,
            color: std::io::stdout().is_terminal(),
        }
    }
}

/// One instance with both of its reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceView {
    /// Name of the package declaring the dependency
    pub package: String,
    pub dependency_type: String,
    /// The specifier as found in the manifest
    pub raw: String,
    pub version: Report,
    pub semver: Report,
}

impl InstanceView {
    /// The report to show: a version problem, else a semver problem, else
    /// the version report
    pub fn primary(&self) -> &Report {
        if self.version.is_invalid() || self.semver.is_valid() {
            &self.version
        } else {
            &self.semver
        }
    }

    pub fn is_valid(&self) -> bool {
        self.version.is_valid() && self.semver.is_valid()
    }
}

/// Every instance of one dependency within one version group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyView {
    pub name: String,
    pub instances: Vec<InstanceView>,
}

impl DependencyView {
    pub fn is_valid(&self) -> bool {
        self.instances.iter().all(InstanceView::is_valid)
    }

    /// Distinct raw specifiers in first-seen order
    pub fn specifiers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for instance in &self.instances {
            if !seen.contains(&instance.raw.as_str()) {
                seen.push(&instance.raw);
            }
        }
        seen
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub label: String,
    pub dependencies: Vec<DependencyView>,
}

/// Pair every version report with the instance's semver report.
/// Must be built before fixes are applied, while `raw` is still the
/// original text.
pub fn build_views(context: &Context, inspection: &Inspection) -> Vec<GroupView> {
    inspection
        .version
        .iter()
        .map(|group| GroupView {
            label: if group.label.is_empty() {
                format!("Version Group {}", group.group)
            } else {
                group.label.clone()
            },
            dependencies: group
                .dependencies
                .iter()
                .map(|dependency| DependencyView {
                    name: dependency.name.clone(),
                    instances: dependency
                        .reports
                        .iter()
                        .map(|report| {
                            let instance = context.instance(report.instance());
                            InstanceView {
                                package: instance.package_name.clone(),
                                dependency_type: instance.dependency_type.name.clone(),
                                raw: instance.raw().to_string(),
                                version: report.clone(),
                                semver: inspection.semver[instance.id.0].clone(),
                            }
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format and write the orchestrator result
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()>;

    /// Format and write just the summary
    fn format_summary(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Create an output formatter based on configuration
pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::with_color(
            config.verbosity,
            config.dry_run,
            config.color,
        )),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.verbosity)),
    }
}
