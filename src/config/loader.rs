// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Pick the configuration for a run.
///
/// - An explicit path must exist and be valid.
/// - Otherwise `Migrun.toml` in `working_dir` is used if present.
/// - Otherwise built-in defaults apply.
pub fn resolve_config(explicit: Option<&Path>, working_dir: &Path) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config from --config");
        return load_and_validate(path);
    }

    let candidate = working_dir.join(default_config_path());
    if candidate.is_file() {
        debug!(path = %candidate.display(), "loading project config");
        return load_and_validate(candidate);
    }

    debug!("no config file; using defaults");
    Ok(ConfigFile::default())
}

/// File name looked up in the working directory when `--config` is absent.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Migrun.toml")
}
