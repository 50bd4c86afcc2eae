// src/exec/supervisor.rs

//! Per-process background tasks.
//!
//! For every launched unit the orchestrator spawns:
//! - a stdout reader that feeds each line through the [`StatusParser`] and
//!   writes surviving tokens into the [`StatusTracker`], in emission order;
//! - a supervisor that owns the [`ChildProcess`] and waits for whichever
//!   comes first: the process exiting on its own, or a kill request.
//!
//! Supervisors are grouped in a [`SupervisorSet`], which is what the
//! orchestrator waits on.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, trace, warn};

use crate::exec::launcher::{ChildProcess, StdoutStream, TerminateOutcome};
use crate::status::{EntryId, StatusParser, StatusTracker};
use crate::types::ProcessExit;

/// How long a supervisor lets the reader catch up on output that was
/// already written when the process exited.
pub const OUTPUT_GRACE: Duration = Duration::from_millis(250);

/// Spawn the stdout reader for one tracker entry.
pub fn spawn_stdout_reader(
    stdout: StdoutStream,
    id: EntryId,
    tracker: StatusTracker,
    parser: StatusParser,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let unit = tracker.name(id).unwrap_or_default().to_string();

        let res = read_lines_lossy(stdout, |line| {
            debug!(unit = %unit, "stdout: {}", line);
            match parser.parse(line) {
                Some(token) => {
                    tracker.update(id, token);
                }
                None => trace!(unit = %unit, "no status in line"),
            }
        })
        .await;

        if let Err(err) = res {
            warn!(unit = %unit, error = %err, "error reading stdout");
        }
        trace!(unit = %unit, "stdout closed");
    })
}

/// Call `on_line` for every line of `stream` until EOF.
///
/// Bytes that are not valid UTF-8 are replaced, never fatal. After a read
/// error the rest of the stream is discarded rather than closed, so the
/// writer does not die on a broken pipe.
pub(crate) async fn read_lines_lossy<R, F>(stream: R, mut on_line: F) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return Ok(()),
            Ok(_) => on_line(decode_line(&buf).as_ref()),
            Err(err) => {
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                return Err(err);
            }
        }
    }
}

/// Decode one raw line, dropping the `\n` or `\r\n` terminator.
pub(crate) fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

/// What a supervisor hands back once its process is gone.
pub struct Supervised {
    pub id: EntryId,
    pub process: Box<dyn ChildProcess>,
    pub exit: Option<ProcessExit>,
    /// True if the process was still running when the kill request arrived.
    pub killed: bool,
}

/// All supervisors of one run.
///
/// Finished supervisors are collected as they complete; the rest can be
/// asked to kill their process at any time.
#[derive(Default)]
pub struct SupervisorSet {
    tasks: JoinSet<Supervised>,
    kills: HashMap<EntryId, oneshot::Sender<()>>,
    finished: Vec<Supervised>,
}

impl SupervisorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the supervisor for one process.
    pub fn spawn(
        &mut self,
        id: EntryId,
        process: Box<dyn ChildProcess>,
        reader: Option<JoinHandle<()>>,
        tracker: StatusTracker,
    ) {
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        self.tasks
            .spawn(supervise(id, process, reader, tracker, kill_rx));
        self.kills.insert(id, kill_tx);
    }

    /// Supervisors whose outcome has not been collected yet.
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Collect supervisors until none is left.
    ///
    /// Cancel-safe: outcomes collected before the future is dropped are kept.
    pub async fn wait_all(&mut self) {
        while let Some(res) = self.tasks.join_next().await {
            match res {
                Ok(done) => {
                    self.kills.remove(&done.id);
                    self.finished.push(done);
                }
                Err(err) => error!(error = %err, "supervisor task failed"),
            }
        }
    }

    /// Send a kill request to every supervisor still waiting on its process.
    ///
    /// Returns how many requests were delivered. Supervisors whose process
    /// already exited are skipped.
    pub fn request_termination(&mut self) -> usize {
        let mut delivered = 0;
        for (id, tx) in self.kills.drain() {
            if tx.send(()).is_ok() {
                delivered += 1;
            } else {
                trace!(entry = id.0, "supervisor already done; no kill sent");
            }
        }
        delivered
    }

    /// Wait for everything and return the outcomes in registration order.
    pub async fn into_finished(mut self) -> Vec<Supervised> {
        self.wait_all().await;
        let mut finished = self.finished;
        finished.sort_by_key(|s| s.id.0);
        finished
    }
}

enum Woke {
    Exited(io::Result<ProcessExit>),
    KillRequested,
}

async fn supervise(
    id: EntryId,
    mut process: Box<dyn ChildProcess>,
    reader: Option<JoinHandle<()>>,
    tracker: StatusTracker,
    kill_rx: oneshot::Receiver<()>,
) -> Supervised {
    let unit = tracker.name(id).unwrap_or_default().to_string();

    let woke = tokio::select! {
        res = process.wait() => Woke::Exited(res),
        Ok(()) = kill_rx => Woke::KillRequested,
    };

    let (exit, killed) = match woke {
        Woke::Exited(res) => {
            let exit = log_exit(&unit, res);
            // Sweep what the process left behind while its group id is
            // still ours; a handle drained later is then a no-op.
            if let Err(err) = process.terminate().await {
                warn!(unit = %unit, error = %err, "failed to sweep process tree after exit");
            }
            (exit, false)
        }
        Woke::KillRequested => {
            info!(unit = %unit, "termination requested; killing process tree");
            let killed = match process.terminate().await {
                Ok(TerminateOutcome::Killed) => true,
                Ok(TerminateOutcome::AlreadyExited) => false,
                Err(err) => {
                    warn!(unit = %unit, error = %err, "failed to terminate process");
                    false
                }
            };
            (log_exit(&unit, process.wait().await), killed)
        }
    };

    if let Some(reader) = reader {
        if tokio::time::timeout(OUTPUT_GRACE, reader).await.is_err() {
            debug!(unit = %unit, "stdout still open after exit; later lines are ignored");
        }
    }

    if let Some(exit) = exit {
        tracker.mark_exited(id, exit);
    }

    Supervised {
        id,
        process,
        exit,
        killed,
    }
}

fn log_exit(unit: &str, res: io::Result<ProcessExit>) -> Option<ProcessExit> {
    match res {
        Ok(exit) => {
            info!(unit = %unit, exit_code = ?exit.code, success = exit.success(), "process exited");
            Some(exit)
        }
        Err(err) => {
            warn!(unit = %unit, error = %err, "error waiting for process");
            None
        }
    }
}
