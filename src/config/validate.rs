// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MigrunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::MigrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.discovery, raw.command, raw.status))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_discovery(cfg)?;
    validate_command(cfg)?;
    validate_status(cfg)?;
    Ok(())
}

fn validate_discovery(cfg: &RawConfigFile) -> Result<()> {
    let pattern = cfg.discovery.pattern.trim();
    if pattern.is_empty() {
        return Err(MigrunError::ConfigError(
            "[discovery].pattern must not be empty".to_string(),
        ));
    }

    Glob::new(pattern).map_err(|e| {
        MigrunError::ConfigError(format!(
            "[discovery].pattern '{}' is not a valid glob: {}",
            pattern, e
        ))
    })?;

    if let Some(bad) = cfg.discovery.exclude_dirs.iter().find(|d| d.trim().is_empty()) {
        return Err(MigrunError::ConfigError(format!(
            "[discovery].exclude_dirs contains an empty entry ({:?})",
            bad
        )));
    }

    Ok(())
}

fn validate_command(cfg: &RawConfigFile) -> Result<()> {
    if cfg.command.program.trim().is_empty() {
        return Err(MigrunError::ConfigError(
            "[command].program must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_status(cfg: &RawConfigFile) -> Result<()> {
    if cfg.status.max_line_length == 0 {
        return Err(MigrunError::ConfigError(
            "[status].max_line_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
