//! In-memory [`ProcessLauncher`] for orchestrator tests.
//!
//! Every unit gets a scripted [`FakeBehaviour`] keyed by its name. The
//! launcher records launches and kills so tests can assert on them after
//! the run.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::time::Instant;

use migrun::errors::{LaunchError, TerminationError};
use migrun::exec::{BoxFuture, ChildProcess, Launched, ProcessLauncher, TerminateOutcome};
use migrun::types::{ProcessExit, RunnableUnit};

/// What a fake process does once launched.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Print `lines` and exit with `code` right away.
    ExitImmediately { code: i32, lines: Vec<String> },
    /// Print `lines` and exit with `code` after `delay`.
    ExitAfter {
        delay: Duration,
        code: i32,
        lines: Vec<String>,
    },
    /// Print `lines` and keep running until killed.
    RunUntilKilled { lines: Vec<String> },
    /// `launch` returns an error.
    FailToLaunch,
}

impl FakeBehaviour {
    pub fn exit(code: i32) -> Self {
        Self::ExitImmediately {
            code,
            lines: vec![],
        }
    }

    pub fn exit_with_lines(code: i32, lines: &[&str]) -> Self {
        Self::ExitImmediately {
            code,
            lines: to_strings(lines),
        }
    }

    pub fn exit_after(delay: Duration, code: i32) -> Self {
        Self::ExitAfter {
            delay,
            code,
            lines: vec![],
        }
    }

    pub fn run_until_killed() -> Self {
        Self::RunUntilKilled { lines: vec![] }
    }

    pub fn run_with_lines(lines: &[&str]) -> Self {
        Self::RunUntilKilled {
            lines: to_strings(lines),
        }
    }
}

fn to_strings(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

/// Everything the fake launcher observed.
#[derive(Debug, Default, Clone)]
pub struct FakeRecords {
    /// Units passed to `launch`, including ones that failed.
    pub launch_calls: Vec<String>,
    /// Every `terminate` call, by unit.
    pub terminate_calls: Vec<String>,
    /// Units that were still running when `terminate` was called.
    pub killed_while_running: Vec<String>,
}

#[derive(Clone)]
pub struct FakeLauncher {
    behaviours: Arc<HashMap<String, FakeBehaviour>>,
    default: FakeBehaviour,
    records: Arc<Mutex<FakeRecords>>,
    next_pid: Arc<AtomicU32>,
}

impl FakeLauncher {
    /// Every unit exits immediately with code 0 unless configured otherwise.
    pub fn new() -> Self {
        Self {
            behaviours: Arc::new(HashMap::new()),
            default: FakeBehaviour::exit(0),
            records: Arc::new(Mutex::new(FakeRecords::default())),
            next_pid: Arc::new(AtomicU32::new(1000)),
        }
    }

    pub fn with(mut self, unit: &str, behaviour: FakeBehaviour) -> Self {
        Arc::make_mut(&mut self.behaviours).insert(unit.to_string(), behaviour);
        self
    }

    pub fn with_default(mut self, behaviour: FakeBehaviour) -> Self {
        self.default = behaviour;
        self
    }

    pub fn records(&self) -> FakeRecords {
        self.records.lock().unwrap().clone()
    }

    pub fn launched(&self) -> Vec<String> {
        self.records().launch_calls
    }

    pub fn killed(&self) -> Vec<String> {
        self.records().killed_while_running
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, unit: &RunnableUnit) -> Result<Launched, LaunchError> {
        self.records
            .lock()
            .unwrap()
            .launch_calls
            .push(unit.name.clone());

        let behaviour = self
            .behaviours
            .get(&unit.name)
            .unwrap_or(&self.default)
            .clone();

        let (lines, exit_at, code) = match behaviour {
            FakeBehaviour::FailToLaunch => {
                return Err(LaunchError {
                    unit: unit.name.clone(),
                    program: unit.program.clone(),
                    working_dir: unit.working_dir.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "fake launch failure"),
                });
            }
            FakeBehaviour::ExitImmediately { code, lines } => (lines, Some(Instant::now()), code),
            FakeBehaviour::ExitAfter { delay, code, lines } => {
                (lines, Some(Instant::now() + delay), code)
            }
            FakeBehaviour::RunUntilKilled { lines } => (lines, None, 0),
        };

        let mut printed = Vec::new();
        for line in lines {
            printed.extend_from_slice(line.as_bytes());
            printed.push(b'\n');
        }

        // Stdout stays open until the fake process exits.
        let (open_end, reader_end) = tokio::io::duplex(64);
        let stdout = io::Cursor::new(printed).chain(reader_end);

        let child = FakeChild {
            name: unit.name.clone(),
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
            exit_at,
            code,
            exit: None,
            stdout_open: Some(open_end),
            records: Arc::clone(&self.records),
        };

        Ok(Launched {
            process: Box::new(child),
            stdout: Some(Box::new(stdout)),
        })
    }
}

struct FakeChild {
    name: String,
    pid: u32,
    /// `None` runs until killed.
    exit_at: Option<Instant>,
    code: i32,
    exit: Option<ProcessExit>,
    stdout_open: Option<DuplexStream>,
    records: Arc<Mutex<FakeRecords>>,
}

impl FakeChild {
    fn set_exit(&mut self, exit: ProcessExit) -> ProcessExit {
        self.stdout_open = None;
        *self.exit.get_or_insert(exit)
    }

    fn exited_by_now(&self) -> bool {
        self.exit.is_some() || self.exit_at.is_some_and(|at| at <= Instant::now())
    }
}

impl ChildProcess for FakeChild {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn wait(&mut self) -> BoxFuture<'_, io::Result<ProcessExit>> {
        Box::pin(async move {
            if let Some(exit) = self.exit {
                return Ok(exit);
            }
            match self.exit_at {
                Some(at) => {
                    tokio::time::sleep_until(at).await;
                    let code = self.code;
                    Ok(self.set_exit(ProcessExit::with_code(code)))
                }
                None => std::future::pending().await,
            }
        })
    }

    fn terminate(&mut self) -> BoxFuture<'_, Result<TerminateOutcome, TerminationError>> {
        Box::pin(async move {
            let running = !self.exited_by_now();
            {
                let mut records = self.records.lock().unwrap();
                records.terminate_calls.push(self.name.clone());
                if running {
                    records.killed_while_running.push(self.name.clone());
                }
            }

            if running {
                self.set_exit(ProcessExit::signalled());
                Ok(TerminateOutcome::Killed)
            } else {
                let code = self.code;
                self.set_exit(ProcessExit::with_code(code));
                Ok(TerminateOutcome::AlreadyExited)
            }
        })
    }
}
