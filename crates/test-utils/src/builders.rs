#![allow(dead_code)]

use std::path::PathBuf;

use migrun::config::{ConfigFile, RawConfigFile};
use migrun::types::{RunnableUnit, StderrMode};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.config.discovery.pattern = pattern.to_string();
        self
    }

    pub fn exclude_dir(mut self, dir: &str) -> Self {
        self.config.discovery.exclude_dirs.push(dir.to_string());
        self
    }

    pub fn program(mut self, program: &str) -> Self {
        self.config.command.program = program.to_string();
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.config.command.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn no_build_arg(mut self, arg: &str) -> Self {
        self.config.command.no_build_arg = arg.to_string();
        self
    }

    pub fn stderr(mut self, mode: StderrMode) -> Self {
        self.config.command.stderr = mode;
        self
    }

    pub fn initial_status(mut self, text: &str) -> Self {
        self.config.status.initial = text.to_string();
        self
    }

    pub fn max_line_length(mut self, len: usize) -> Self {
        self.config.status.max_line_length = len;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RunnableUnit`.
pub struct UnitBuilder {
    unit: RunnableUnit,
}

impl UnitBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            unit: RunnableUnit {
                name: name.to_string(),
                working_dir: PathBuf::from("."),
                program: "true".to_string(),
                args: vec![],
            },
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.unit.working_dir = dir.into();
        self
    }

    pub fn program(mut self, program: &str) -> Self {
        self.unit.program = program.to_string();
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.unit.args.push(arg.to_string());
        self
    }

    /// Run `script` with `sh -c`.
    pub fn shell(self, script: &str) -> Self {
        self.program("sh").arg("-c").arg(script)
    }

    pub fn build(self) -> RunnableUnit {
        self.unit
    }
}

/// One default unit per name.
pub fn units(names: &[&str]) -> Vec<RunnableUnit> {
    names.iter().map(|n| UnitBuilder::new(n).build()).collect()
}
