// src/discovery/command.rs

use std::path::Path;

use crate::config::{CommandSection, PROJECT_PLACEHOLDER};
use crate::types::RunnableUnit;

/// Turn a project file into the unit that runs it.
///
/// The unit is named after the file, runs in the file's directory, and gets
/// the configured arguments with `{project}` replaced by the file path.
pub fn build_unit(project: &Path, cmd: &CommandSection, no_build: bool) -> RunnableUnit {
    let name = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| project.display().to_string());

    let working_dir = project
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let project_arg = project.display().to_string();
    let mut args: Vec<String> = cmd
        .args
        .iter()
        .map(|arg| arg.replace(PROJECT_PLACEHOLDER, &project_arg))
        .collect();

    if no_build && !cmd.no_build_arg.is_empty() {
        args.push(cmd.no_build_arg.clone());
    }

    RunnableUnit {
        name,
        working_dir: working_dir.to_path_buf(),
        program: cmd.program.clone(),
        args,
    }
}
