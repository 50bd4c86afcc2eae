// src/lib.rs

pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod status;
pub mod types;
pub mod view;

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::resolve_config;
use crate::discovery::discover_units;
use crate::engine::Orchestrator;
use crate::errors::Result;
use crate::exec::SystemLauncher;
use crate::fs::{FileSystem, RealFileSystem};
use crate::status::StatusParser;
use crate::types::RunnableUnit;
use crate::view::TerminalSurface;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - project discovery
/// - the orchestrator with the real launcher and terminal view
/// - Ctrl-C handling
///
/// Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let fs = RealFileSystem;
    let working_dir = match args.working_directory {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    // Commands run inside each project's directory, so paths handed to
    // them must not be relative to ours.
    let working_dir: PathBuf = fs.canonicalize(&working_dir)?;

    let cfg = resolve_config(args.config.as_deref(), &working_dir)?;
    let units = discover_units(&fs, &working_dir, &cfg, args.no_build)?;

    if args.dry_run {
        print_dry_run(&units);
        return Ok(0);
    }

    // Ctrl-C → cancel the run; the orchestrator tears every process down.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; cancelling run");
            cancel.cancel();
        });
    }

    let orchestrator = Orchestrator::new(
        SystemLauncher::new(cfg.command.stderr),
        TerminalSurface::stdout(),
    )
    .with_parser(StatusParser::new(cfg.status.max_line_length))
    .with_initial_status(cfg.status.initial.clone());

    let report = orchestrator.run(units, cancel).await?;
    info!(
        outcome = ?report.outcome,
        killed = report.killed(),
        "run finished"
    );

    Ok(report.exit_code())
}

/// Simple dry-run output: print every unit and its command.
fn print_dry_run(units: &[RunnableUnit]) {
    println!("migrun dry-run");
    println!("{} project(s) found.", units.len());
    println!();

    for unit in units {
        println!("  - {}", unit.name);
        println!("      dir: {}", unit.working_dir.display());
        println!("      cmd: {}", unit.command_line());
    }

    debug!("dry-run complete (no execution)");
}
