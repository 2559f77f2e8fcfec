//! CLI argument parsing module for depsync

use crate::config::Overrides;
use crate::update::UpdateFilter;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Parse duration string in format: Nd (days), Nw (weeks), Nm (months)
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    const DAY: u64 = 24 * 60 * 60;
    let (num_str, unit_secs) = if let Some(n) = s.strip_suffix('d') {
        (n, DAY)
    } else if let Some(n) = s.strip_suffix('w') {
        (n, 7 * DAY)
    } else if let Some(n) = s.strip_suffix('m') {
        // months are 30 days
        (n, 30 * DAY)
    } else {
        return Err(format!("invalid duration format: {}", s));
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in duration: {}", num_str))?;

    Ok(Duration::from_secs(num * unit_secs))
}

/// Keep dependency versions consistent across a monorepo
#[derive(Parser, Debug, Clone)]
#[command(
    name = "depsync",
    version,
    about = "Keep dependency versions consistent across the package.json files of a monorepo"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Report every mismatch; exits 1 when any is found
    Lint(CommonArgs),
    /// List every dependency and its specifiers
    List(CommonArgs),
    /// Rewrite every fixable mismatch
    Fix(FixArgs),
    /// Look up newer versions on the npm registry and apply them
    Update(UpdateArgs),
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Repository root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Config file to use instead of searching the repository root
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Glob of package.json files to read (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub source: Vec<String>,

    /// Only inspect dependencies whose name matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Dependency types to inspect, comma-separated (e.g. prod,dev,!peer)
    #[arg(long, value_delimiter = ',')]
    pub dependency_types: Option<Vec<String>>,

    /// Specifier types to inspect, comma-separated (e.g. exact,range)
    #[arg(long, value_delimiter = ',')]
    pub specifier_types: Option<Vec<String>>,

    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - summary only
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FixArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Dry run mode - show what would change without writing
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Dry run mode - show what would be updated without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Apply updates without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Exclude specific packages from update (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Update only specific packages (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub only: Vec<String>,

    /// Consider prerelease versions
    #[arg(long)]
    pub prerelease: bool,

    /// Only update to versions released at least this long ago (e.g., 2w, 10d, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub age: Option<Duration>,

    /// Registry to query instead of registry.npmjs.org
    #[arg(long)]
    pub registry: Option<String>,
}

impl CommonArgs {
    /// CLI values which replace rcfile values
    pub fn overrides(&self) -> Overrides {
        Overrides {
            source: (!self.source.is_empty()).then(|| self.source.clone()),
            filter: self.filter.clone(),
            dependency_types: self.dependency_types.clone(),
            specifier_types: self.specifier_types.clone(),
        }
    }
}

impl UpdateArgs {
    pub fn filter(&self) -> UpdateFilter {
        let filter = UpdateFilter::new()
            .with_exclude(self.exclude.clone())
            .with_only(self.only.clone())
            .with_include_prerelease(self.prerelease);
        match self.age {
            Some(age) => filter.with_min_age(age),
            None => filter,
        }
    }
}

impl CliArgs {
    pub fn common(&self) -> &CommonArgs {
        match &self.command {
            Command::Lint(common) | Command::List(common) => common,
            Command::Fix(args) => &args.common,
            Command::Update(args) => &args.common,
        }
    }

    pub fn dry_run(&self) -> bool {
        match &self.command {
            Command::Lint(_) | Command::List(_) => false,
            Command::Fix(args) => args.dry_run,
            Command::Update(args) => args.dry_run,
        }
    }
}

/// Ask a y/N question. Anything but `y`/`yes` (including EOF) is a no.
pub fn confirm(question: &str, input: &mut dyn BufRead, output: &mut dyn Write) -> std::io::Result<bool> {
    write!(output, "{} [y/N] ", question)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
