// src/discovery/mod.rs

//! Finding the units to run.
//!
//! - [`scan`] walks the working directory for project files.
//! - [`command`] builds the command line for each project.

pub mod command;
pub mod scan;

use std::path::Path;

use tracing::info;

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::RunnableUnit;

pub use command::build_unit;
pub use scan::{ProjectMatcher, find_projects};

/// Discover every project below `root` and build its runnable unit.
pub fn discover_units(
    fs: &dyn FileSystem,
    root: &Path,
    cfg: &ConfigFile,
    no_build: bool,
) -> Result<Vec<RunnableUnit>> {
    let matcher = ProjectMatcher::from_config(&cfg.discovery)?;
    let projects = find_projects(fs, root, &matcher)?;

    info!(
        root = %root.display(),
        pattern = %cfg.discovery.pattern,
        count = projects.len(),
        "discovery finished"
    );

    Ok(projects
        .iter()
        .map(|p| build_unit(p, &cfg.command, no_build))
        .collect())
}
