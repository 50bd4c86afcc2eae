// src/exec/system.rs

//! Real OS-process launcher.
//!
//! Each child is started as the leader of its own process group (Unix), so
//! that a kill request can take down everything it spawned. On Windows the
//! tree is killed with `taskkill /T /F`.

use std::io;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::errors::{LaunchError, TerminationError};
use crate::exec::launcher::{
    BoxFuture, ChildProcess, Launched, ProcessLauncher, StdoutStream, TerminateOutcome,
};
use crate::exec::supervisor::read_lines_lossy;
use crate::types::{ProcessExit, RunnableUnit, StderrMode};

/// Launcher used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher {
    stderr: StderrMode,
}

impl SystemLauncher {
    pub fn new(stderr: StderrMode) -> Self {
        Self { stderr }
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, unit: &RunnableUnit) -> Result<Launched, LaunchError> {
        let (child, stdout) = self.spawn(unit)?;
        Ok(Launched {
            process: Box::new(child),
            stdout,
        })
    }
}

impl SystemLauncher {
    fn spawn(
        &self,
        unit: &RunnableUnit,
    ) -> Result<(SystemChild, Option<StdoutStream>), LaunchError> {
        let mut cmd = Command::new(&unit.program);
        cmd.args(&unit.args)
            .current_dir(&unit.working_dir)
            // Children live in a background process group; a terminal read
            // would stop them.
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(match self.stderr {
                StderrMode::Inherit => Stdio::inherit(),
                StderrMode::Discard => Stdio::null(),
                StderrMode::Log => Stdio::piped(),
            })
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| LaunchError {
            unit: unit.name.clone(),
            program: unit.program.clone(),
            working_dir: unit.working_dir.clone(),
            source,
        })?;

        let pid = child.id();
        info!(unit = %unit.name, ?pid, cmd = %unit.command_line(), "started process");

        let stdout = child
            .stdout
            .take()
            .map(|out| Box::new(out) as StdoutStream);

        if let Some(stderr) = child.stderr.take() {
            let unit_name = unit.name.clone();
            tokio::spawn(async move {
                let res = read_lines_lossy(stderr, |line| {
                    debug!(unit = %unit_name, "stderr: {}", line);
                })
                .await;
                if let Err(err) = res {
                    warn!(unit = %unit_name, error = %err, "error reading stderr");
                }
            });
        }

        let child = SystemChild {
            unit: unit.name.clone(),
            child,
            pid,
            exit: None,
            tree_alive: true,
        };
        Ok((child, stdout))
    }
}

/// A child started by [`SystemLauncher`].
#[derive(Debug)]
pub struct SystemChild {
    unit: String,
    child: Child,
    pid: Option<u32>,
    exit: Option<ProcessExit>,
    /// Cleared once the OS reports nothing left to signal in the tree.
    tree_alive: bool,
}

impl SystemChild {
    fn record_exit(&mut self, status: std::process::ExitStatus) -> ProcessExit {
        let exit = ProcessExit {
            code: status.code(),
        };
        self.exit = Some(exit);
        exit
    }

    fn poll_exit(&mut self) -> io::Result<Option<ProcessExit>> {
        if let Some(exit) = self.exit {
            return Ok(Some(exit));
        }
        Ok(self.child.try_wait()?.map(|status| self.record_exit(status)))
    }
}

impl ChildProcess for SystemChild {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn wait(&mut self) -> BoxFuture<'_, io::Result<ProcessExit>> {
        Box::pin(async move {
            if let Some(exit) = self.exit {
                return Ok(exit);
            }
            let status = self.child.wait().await?;
            Ok(self.record_exit(status))
        })
    }

    fn terminate(&mut self) -> BoxFuture<'_, Result<TerminateOutcome, TerminationError>> {
        Box::pin(async move {
            let already_exited = self.poll_exit()?.is_some();

            // Windows cannot walk a tree whose root is gone, and the pid may
            // already belong to someone else.
            let sweep = cfg!(unix) || !already_exited;

            let mut swept = Ok(());
            if let Some(pid) = self.pid.filter(|_| self.tree_alive && sweep) {
                // The group outlives its leader while descendants remain, so
                // it is swept even when the leader itself is gone.
                match kill_tree(pid).await {
                    Ok(true) => {}
                    Ok(false) => self.tree_alive = false,
                    Err(err) if already_exited => swept = Err(err),
                    Err(err) => {
                        warn!(unit = %self.unit, pid, error = %err, "tree kill failed; killing leader only");
                    }
                }
            }

            if already_exited {
                // The leader is reaped, so its group id is free for reuse;
                // only this first sweep may signal it.
                self.tree_alive = false;
                swept?;
                debug!(unit = %self.unit, "terminate requested for exited process");
                return Ok(TerminateOutcome::AlreadyExited);
            }

            match self.child.start_kill() {
                Ok(()) => {}
                // Reaped between the poll above and now.
                Err(err) if err.kind() == io::ErrorKind::InvalidInput => {}
                Err(err) => return Err(err.into()),
            }

            info!(unit = %self.unit, pid = ?self.pid, "killed process tree");
            Ok(TerminateOutcome::Killed)
        })
    }
}

/// Signal every process in the tree rooted at `pid`.
///
/// Returns `Ok(false)` when there was nothing left to signal.
#[cfg(unix)]
async fn kill_tree(pid: u32) -> Result<bool, TerminationError> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| TerminationError::Signal {
        pid,
        reason: "pid out of range".to_string(),
    })?;

    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(errno) => Err(TerminationError::Signal {
            pid,
            reason: errno.desc().to_string(),
        }),
    }
}

#[cfg(windows)]
async fn kill_tree(pid: u32) -> Result<bool, TerminationError> {
    let status = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    Ok(status.success())
}
