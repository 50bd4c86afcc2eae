// src/config/model.rs

use serde::Deserialize;

use crate::status::{DEFAULT_INITIAL_STATUS, DEFAULT_MAX_LINE_LENGTH};
use crate::types::StderrMode;

/// Placeholder in `[command].args` replaced by the project file path.
pub const PROJECT_PLACEHOLDER: &str = "{project}";

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [discovery]
/// pattern = "*DbMigrator.csproj"
/// exclude_dirs = ["bin", "obj", ".git", "node_modules"]
///
/// [command]
/// program = "dotnet"
/// args = ["run", "--project", "{project}"]
/// no_build_arg = "--no-build"
/// stderr = "inherit"
///
/// [status]
/// initial = "Running..."
/// max_line_length = 90
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub discovery: DiscoverySection,

    #[serde(default)]
    pub command: CommandSection,

    #[serde(default)]
    pub status: StatusSection,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub discovery: DiscoverySection,
    pub command: CommandSection,
    pub status: StatusSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        discovery: DiscoverySection,
        command: CommandSection,
        status: StatusSection,
    ) -> Self {
        Self {
            discovery,
            command,
            status,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.discovery, raw.command, raw.status)
    }
}

/// `[discovery]` section: which files count as runnable projects.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySection {
    /// Glob matched against file names (not full paths).
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Directory names that are never descended into.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

fn default_pattern() -> String {
    "*DbMigrator.csproj".to_string()
}

fn default_exclude_dirs() -> Vec<String> {
    ["bin", "obj", ".git", "node_modules"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            exclude_dirs: default_exclude_dirs(),
        }
    }
}

/// `[command]` section: how a discovered project is run.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSection {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments; `{project}` is replaced by the project file path.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Appended to `args` when `--no-build` is given.
    #[serde(default = "default_no_build_arg")]
    pub no_build_arg: String,

    #[serde(default)]
    pub stderr: StderrMode,
}

fn default_program() -> String {
    "dotnet".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "run".to_string(),
        "--project".to_string(),
        PROJECT_PLACEHOLDER.to_string(),
    ]
}

fn default_no_build_arg() -> String {
    "--no-build".to_string()
}

impl Default for CommandSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            no_build_arg: default_no_build_arg(),
            stderr: StderrMode::default(),
        }
    }
}

/// `[status]` section: how stdout lines become table statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusSection {
    /// Status shown before a process prints anything useful.
    #[serde(default = "default_initial")]
    pub initial: String,

    /// Lines this long or longer are treated as noise.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_initial() -> String {
    DEFAULT_INITIAL_STATUS.to_string()
}

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

impl Default for StatusSection {
    fn default() -> Self {
        Self {
            initial: default_initial(),
            max_line_length: default_max_line_length(),
        }
    }
}
