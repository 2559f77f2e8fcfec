//! depsync - keep dependency versions consistent across a monorepo
//!
//! Commands:
//! - lint: report mismatched specifiers
//! - list: show every dependency and its specifiers
//! - fix: rewrite fixable mismatches
//! - update: move dependencies to newer npm releases

use clap::Parser;
use depsync::cli::{confirm, CliArgs};
use depsync::orchestrator::Orchestrator;
use depsync::output::{create_formatter, OutputConfig};
use depsync::update::ProposedUpdate;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.common().verbose);

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr. `RUST_LOG` wins; otherwise warnings, or debug output
/// for depsync itself with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,depsync=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Show the proposed updates on stderr and ask. Without a terminal the
/// answer is no; `--yes` skips the question.
fn ask(updates: &[ProposedUpdate]) -> bool {
    if !io::stdin().is_terminal() {
        eprintln!("Not a terminal; rerun with --yes to apply {} update(s)", updates.len());
        return false;
    }
    let mut stderr = io::stderr().lock();
    for update in updates {
        let _ = writeln!(stderr, "  {} {} -> {}", update.name, update.current, update.latest);
    }
    let question = format!("Apply {} update(s)?", updates.len());
    confirm(&question, &mut io::stdin().lock(), &mut stderr).unwrap_or(false)
}

async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let common = args.common();
    let output_config = OutputConfig::from_cli(common.json, common.verbose, common.quiet, args.dry_run());

    let orchestrator = Orchestrator::new(args.clone())?;
    let result = orchestrator.run(&mut ask).await?;

    let formatter = create_formatter(output_config);
    let mut stdout = io::stdout().lock();
    formatter.format(&result, &mut stdout)?;
    stdout.flush()?;

    Ok(ExitCode::from(result.exit_code()))
}
