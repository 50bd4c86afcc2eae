// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `migrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "migrun",
    version,
    about = "Runs all DbMigrator projects below a directory in parallel and shows their progress.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to search for projects.
    ///
    /// Default: the current working directory.
    #[arg(value_name = "WORKING_DIRECTORY")]
    pub working_directory: Option<PathBuf>,

    /// Skip the build step (appends the configured `no_build_arg`, by
    /// default `--no-build`, to every command).
    #[arg(long)]
    pub no_build: bool,

    /// Path to a config file (TOML).
    ///
    /// Default: `Migrun.toml` in the working directory, if it exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MIGRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Discover projects and print their commands without running anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
