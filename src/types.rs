use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// One discovered external command to run as a child process.
///
/// Built once by discovery and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnableUnit {
    /// Display name (the project file name for discovered projects).
    pub name: String,
    /// Directory the command is started in.
    pub working_dir: PathBuf,
    /// Executable to start.
    pub program: String,
    /// Arguments passed to `program`.
    pub args: Vec<String>,
}

impl RunnableUnit {
    pub fn new(
        name: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable command line, used for dry runs and logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// OS-confirmed exit of a child process.
///
/// `code` is `None` when the process was terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn signalled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// What happens to a child's standard error.
///
/// Stdout is always captured for status parsing; stderr is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StderrMode {
    /// Child writes straight to our stderr.
    #[default]
    Inherit,
    /// Child stderr goes to the null device.
    Discard,
    /// Child stderr is piped and every line logged at debug level.
    Log,
}

impl FromStr for StderrMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inherit" => Ok(StderrMode::Inherit),
            "discard" => Ok(StderrMode::Discard),
            "log" => Ok(StderrMode::Log),
            other => Err(format!(
                "invalid stderr mode: {other} (expected \"inherit\", \"discard\" or \"log\")"
            )),
        }
    }
}
