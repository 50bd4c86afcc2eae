// src/discovery/scan.rs

//! Recursive search for project files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use globset::{Glob, GlobMatcher};
use tracing::{debug, trace, warn};

use crate::config::DiscoverySection;
use crate::errors::{MigrunError, Result};
use crate::fs::FileSystem;

/// Compiled discovery rules.
#[derive(Debug, Clone)]
pub struct ProjectMatcher {
    file: GlobMatcher,
    exclude_dirs: HashSet<String>,
}

impl ProjectMatcher {
    pub fn from_config(cfg: &DiscoverySection) -> Result<Self> {
        let glob = Glob::new(cfg.pattern.trim()).map_err(|e| {
            MigrunError::ConfigError(format!("invalid discovery pattern '{}': {}", cfg.pattern, e))
        })?;

        Ok(Self {
            file: glob.compile_matcher(),
            exclude_dirs: cfg.exclude_dirs.iter().cloned().collect(),
        })
    }

    /// Does this file name look like a runnable project?
    pub fn matches_file(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.file.is_match(name))
    }

    pub fn skips_dir(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.exclude_dirs.contains(name))
    }
}

/// Find every project file below `root`, sorted by path.
///
/// Unreadable subdirectories are logged and skipped; an unreadable root is
/// an error. Directories reached twice (symlink loops) are visited once.
pub fn find_projects(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &ProjectMatcher,
) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(root) {
        return Err(MigrunError::Other(anyhow!(
            "working directory {:?} does not exist or is not a directory",
            root
        )));
    }

    let mut found = Vec::new();
    let mut visited = HashSet::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let key = fs.canonicalize(&dir).unwrap_or_else(|_| dir.clone());
        if !visited.insert(key) {
            trace!(dir = %dir.display(), "already visited");
            continue;
        }

        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if dir == root => return Err(MigrunError::Other(err)),
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "skipping unreadable directory");
                continue;
            }
        };

        for entry in entries {
            if fs.is_dir(&entry) {
                if matcher.skips_dir(&entry) {
                    trace!(dir = %entry.display(), "excluded directory");
                } else {
                    pending.push(entry);
                }
            } else if fs.is_file(&entry) && matcher.matches_file(&entry) {
                debug!(project = %entry.display(), "found project");
                found.push(entry);
            }
        }
    }

    found.sort();
    Ok(found)
}
