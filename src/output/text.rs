//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Reports grouped by version group, one block per dependency
//! - Proposed registry updates with major/minor/patch indication
//! - A summary line per run

use crate::domain::{Report, RunSummary};
use crate::orchestrator::{OrchestratorResult, RunKind};
use crate::output::{DependencyView, GroupView, InstanceView, OutputFormatter, Verbosity};
use crate::specifier::coerce;
use crate::update::{ProposedUpdate, SkipReason};
use colored::Colorize;
use std::io::Write;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Unknown or unparseable
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions or ranges
    pub fn from_versions(old: &str, new: &str) -> Self {
        match (coerce(old), coerce(new)) {
            (Some(old), Some(new)) => {
                if new.major != old.major {
                    VersionChangeType::Major
                } else if new.minor != old.minor {
                    VersionChangeType::Minor
                } else {
                    VersionChangeType::Patch
                }
            }
            _ => VersionChangeType::Unknown,
        }
    }

    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    dry_run: bool,
    color: bool,
}

impl TextFormatter {
    pub fn new(verbosity: Verbosity, dry_run: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color: true,
        }
    }

    pub fn with_color(verbosity: Verbosity, dry_run: bool, color: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color,
        }
    }

    fn dry_run_prefix(&self) -> String {
        match (self.dry_run, self.color) {
            (false, _) => String::new(),
            (true, true) => format!("{} ", "(dry-run)".cyan()),
            (true, false) => "(dry-run) ".to_string(),
        }
    }

    fn icon(&self, report: &Report) -> String {
        let (icon, plain) = match report {
            Report::Valid { .. } => ("✓".green(), "✓"),
            Report::Fixable { .. } => ("✘".yellow(), "✘"),
            Report::Unfixable { .. } => ("✘".red(), "✘"),
        };
        if self.color {
            icon.to_string()
        } else {
            plain.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn format_skip_reason(reason: &SkipReason) -> String {
        match reason {
            SkipReason::AlreadyLatest => "latest".to_string(),
            SkipReason::NoSuitableVersion => "no suitable version".to_string(),
            SkipReason::FetchFailed(msg) => format!("fetch failed: {}", msg),
        }
    }

    /// Whether a dependency block is printed at all
    fn shows(&self, kind: RunKind, dependency: &DependencyView) -> bool {
        kind == RunKind::List || self.verbosity == Verbosity::Verbose || !dependency.is_valid()
    }

    fn format_group(
        &self,
        kind: RunKind,
        group: &GroupView,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let shown: Vec<&DependencyView> = group
            .dependencies
            .iter()
            .filter(|d| self.shows(kind, d))
            .collect();
        if shown.is_empty() {
            return Ok(());
        }

        let header = format!("= {} =", group.label);
        if self.color {
            writeln!(writer, "{}", header.bold())?;
        } else {
            writeln!(writer, "{}", header)?;
        }
        let width = shown.iter().map(|d| d.name.len()).max().unwrap_or(0);
        for dependency in shown {
            self.format_dependency(dependency, width, writer)?;
        }
        writeln!(writer)
    }

    /// Valid dependencies take one line; invalid ones list every instance
    fn format_dependency(
        &self,
        dependency: &DependencyView,
        width: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let name = format!("{:width$}", dependency.name, width = width);
        if dependency.is_valid() {
            let first = &dependency.instances[0];
            return writeln!(
                writer,
                "  {} {} {} {}",
                self.icon(first.primary()),
                name,
                dependency.specifiers().join(", "),
                self.dim(&format!("({})", dependency.instances.len()))
            );
        }

        let worst = dependency
            .instances
            .iter()
            .map(InstanceView::primary)
            .find(|r| r.is_unfixable())
            .or_else(|| dependency.instances.iter().map(InstanceView::primary).find(|r| r.is_fixable()));
        let icon = worst.map(|r| self.icon(r)).unwrap_or_default();
        if self.color {
            writeln!(writer, "  {} {}", icon, name.bold())?;
        } else {
            writeln!(writer, "  {} {}", icon, name)?;
        }
        for instance in &dependency.instances {
            self.format_instance(instance, writer)?;
        }
        Ok(())
    }

    fn format_instance(&self, instance: &InstanceView, writer: &mut dyn Write) -> std::io::Result<()> {
        let report = instance.primary();
        let location = self.dim(&format!("in {} ({})", instance.package, instance.dependency_type));
        let specifier = match report.fix() {
            Some(fix) if self.color => format!(
                "{} {} {}",
                instance.raw.dimmed(),
                "→".dimmed(),
                fix.to_string().bright_white().bold()
            ),
            Some(fix) => format!("{} -> {}", instance.raw, fix),
            None => instance.raw.clone(),
        };
        let detail = match report {
            Report::Valid { .. } => String::new(),
            _ => {
                let text = match report {
                    Report::Unfixable { .. } => report.to_string(),
                    _ => report.name().to_string(),
                };
                format!(" [{}]", text)
            }
        };
        writeln!(
            writer,
            "      {} {} {}{}",
            self.icon(report),
            specifier,
            location,
            detail
        )
    }

    fn format_updates(
        &self,
        updates: &[ProposedUpdate],
        skipped: &[(String, SkipReason)],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if updates.is_empty() {
            writeln!(writer, "{}", self.dim("All dependencies are up to date"))?;
        }
        let width = updates.iter().map(|u| u.name.len()).max().unwrap_or(0).max(20);
        for update in updates {
            let change = VersionChangeType::from_versions(&update.current, &update.latest);
            let date = format!(" ({})", update.released_at.format("%Y/%m/%d %H:%M"));
            if self.color {
                writeln!(
                    writer,
                    "  {:width$} {} {} {} [{}]{}",
                    update.name,
                    update.current.dimmed(),
                    "→".dimmed(),
                    update.latest.bright_white().bold(),
                    change.colored_label(),
                    date.dimmed(),
                    width = width
                )?;
            } else {
                writeln!(
                    writer,
                    "  {:width$} {} -> {} [{}]{}",
                    update.name,
                    update.current,
                    update.latest,
                    change.label(),
                    date,
                    width = width
                )?;
            }
        }

        if self.verbosity == Verbosity::Verbose && !skipped.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "  {}", self.dim("Skipped:"))?;
            for (name, reason) in skipped {
                let line = format!("{:width$} ({})", name, Self::format_skip_reason(reason), width = width);
                writeln!(writer, "  {}", self.dim(&line))?;
            }
        }
        writeln!(writer)
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Quiet {
            return self.format_summary(&result.summary, writer);
        }

        if result.kind == RunKind::Update {
            self.format_updates(&result.updates, &result.skipped, writer)?;
        } else {
            for group in &result.groups {
                self.format_group(result.kind, group, writer)?;
            }
        }

        if !result.errors.is_empty() {
            if self.color {
                writeln!(writer, "{}:", "Errors".red().bold())?;
            } else {
                writeln!(writer, "Errors:")?;
            }
            for error in &result.errors {
                if self.color {
                    writeln!(writer, "  {} {}", "✗".red(), error)?;
                } else {
                    writeln!(writer, "  - {}", error)?;
                }
            }
            writeln!(writer)?;
        }

        self.format_summary(&result.summary, writer)
    }

    fn format_summary(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let prefix = self.dry_run_prefix();

        if summary.total() > 0 {
            if self.color {
                writeln!(
                    writer,
                    "{}{} valid, {} fixable, {} unfixable",
                    prefix,
                    summary.valid.to_string().green(),
                    summary.fixable.to_string().yellow(),
                    summary.unfixable.to_string().red()
                )?;
            } else {
                writeln!(
                    writer,
                    "{}{} valid, {} fixable, {} unfixable",
                    prefix, summary.valid, summary.fixable, summary.unfixable
                )?;
            }
        }

        if !summary.manifests.is_empty() {
            let verb = if summary.dry_run { "would change" } else { "changed" };
            writeln!(
                writer,
                "{}{} specifier(s) {} in {} file(s)",
                prefix,
                summary.total_changes(),
                verb,
                summary.files_modified()
            )?;
        }
        Ok(())
    }
}
