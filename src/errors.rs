// src/errors.rs

//! Crate-wide error types and aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A unit's command could not be started.
///
/// Fatal for the whole run: the orchestrator drains whatever was already
/// started and then reports this upward.
#[derive(Error, Debug)]
#[error("failed to launch '{unit}' ({program} in {working_dir:?}): {source}")]
pub struct LaunchError {
    pub unit: String,
    pub program: String,
    pub working_dir: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A kill request was not honoured by the OS.
///
/// Never fatal; draining logs it and moves on to the next process.
#[derive(Error, Debug)]
pub enum TerminationError {
    #[error("failed to signal process tree of pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    #[error("failed to kill process: {0}")]
    Io(#[from] std::io::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MigrunError>;
