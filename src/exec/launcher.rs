// src/exec/launcher.rs

//! Launcher abstraction.
//!
//! The orchestrator talks to a [`ProcessLauncher`] instead of spawning
//! processes itself. Production code uses [`SystemLauncher`]; tests can plug
//! in a fake that never touches the OS.
//!
//! [`SystemLauncher`]: super::system::SystemLauncher

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::io::AsyncRead;

use crate::errors::{LaunchError, TerminationError};
use crate::types::{ProcessExit, RunnableUnit};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A child's captured standard output.
pub type StdoutStream = Box<dyn AsyncRead + Send + Unpin>;

/// Result of a kill request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// The process was still running and has been told to die.
    Killed,
    /// The process had already exited; nothing was signalled to it.
    AlreadyExited,
}

/// Control over one running child process.
pub trait ChildProcess: Send {
    /// OS process id, if known.
    fn pid(&self) -> Option<u32>;

    /// Resolve once the OS confirms the process has exited.
    ///
    /// Must be cancel-safe and may be called again after it resolved.
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ProcessExit>>;

    /// Kill the process together with every process it spawned.
    ///
    /// Idempotent: calling it on an exited process reports
    /// [`TerminateOutcome::AlreadyExited`] and leaves it exited.
    fn terminate(&mut self) -> BoxFuture<'_, Result<TerminateOutcome, TerminationError>>;
}

/// A freshly started unit.
pub struct Launched {
    pub process: Box<dyn ChildProcess>,
    pub stdout: Option<StdoutStream>,
}

impl std::fmt::Debug for Launched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launched")
            .field("pid", &self.process.pid())
            .field("stdout", &self.stdout.is_some())
            .finish()
    }
}

/// Starts the command of a [`RunnableUnit`].
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, unit: &RunnableUnit) -> Result<Launched, LaunchError>;
}
