// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for starting the commands of the runnable
//! units with `tokio::process::Command`, turning their stdout into status
//! updates, and killing whole process trees on request.
//!
//! - [`launcher`] defines the `ProcessLauncher` / `ChildProcess` traits the
//!   orchestrator is written against, so tests can swap in fakes.
//! - [`system`] is the real launcher (process groups, tree-wide kill).
//! - [`supervisor`] owns the per-process reader and supervisor tasks.

pub mod launcher;
pub mod supervisor;
pub mod system;

pub use launcher::{
    BoxFuture, ChildProcess, Launched, ProcessLauncher, StdoutStream, TerminateOutcome,
};
pub use supervisor::{OUTPUT_GRACE, Supervised, SupervisorSet, spawn_stdout_reader};
pub use system::{SystemChild, SystemLauncher};
