// src/engine/runtime.rs

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::{LaunchError, Result};
use crate::exec::{Launched, ProcessLauncher, SupervisorSet, TerminateOutcome, spawn_stdout_reader};
use crate::status::{DEFAULT_INITIAL_STATUS, StatusParser, StatusTracker};
use crate::types::{ProcessExit, RunnableUnit};
use crate::view::{LiveView, ViewSurface};

use super::core::{Lifecycle, LifecycleEvent};
use super::{RunOutcome, RunReport, UnitReport};

/// Drives one run: launch every unit, watch their output, wait for them or
/// for cancellation, then tear every process tree down.
///
/// Processes are started through a [`ProcessLauncher`] and everything the
/// user sees goes to a [`ViewSurface`], so both can be replaced in tests.
pub struct Orchestrator<L, S> {
    launcher: L,
    surface: S,
    parser: StatusParser,
    initial_status: String,
}

impl<L, S> fmt::Debug for Orchestrator<L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("parser", &self.parser)
            .field("initial_status", &self.initial_status)
            .finish_non_exhaustive()
    }
}

impl<L, S> Orchestrator<L, S>
where
    L: ProcessLauncher,
    S: ViewSurface + 'static,
{
    pub fn new(launcher: L, surface: S) -> Self {
        Self {
            launcher,
            surface,
            parser: StatusParser::default(),
            initial_status: DEFAULT_INITIAL_STATUS.to_string(),
        }
    }

    pub fn with_parser(mut self, parser: StatusParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_initial_status(mut self, status: impl Into<String>) -> Self {
        self.initial_status = status.into();
        self
    }

    /// Run the units to completion or cancellation.
    ///
    /// Returns the report once every process is confirmed gone. If a unit
    /// cannot be launched, the ones already started are torn down first and
    /// the launch error is returned.
    pub async fn run(self, units: Vec<RunnableUnit>, cancel: CancellationToken) -> Result<RunReport> {
        let Orchestrator {
            launcher,
            surface,
            parser,
            initial_status,
        } = self;

        let mut lifecycle = Lifecycle::new();
        let mut console = Console::new(surface);

        lifecycle.step(LifecycleEvent::UnitsReceived).map_err(anyhow::Error::from)?;
        console.say(&format!("{} project(s) found.", units.len()));

        let launch = launch_all(&launcher, &units, &cancel);
        let launched = match launch {
            LaunchPhase::Complete(launched) => launched,
            LaunchPhase::Failed { launched, error } => {
                lifecycle.step(LifecycleEvent::LaunchFailed).map_err(anyhow::Error::from)?;
                console.say(&format!("- Killing running {} processes...", launched.len()));
                drain_unsupervised(launched).await;
                lifecycle.step(LifecycleEvent::Drained).map_err(anyhow::Error::from)?;
                console.say("Aborted: a project could not be started.");
                return Err(error.into());
            }
            LaunchPhase::Cancelled(launched) => {
                lifecycle.step(LifecycleEvent::CancelRequested).map_err(anyhow::Error::from)?;
                console.say(&format!("- Killing running {} processes...", launched.len()));
                let units = drain_into_reports(&units, launched, &initial_status).await;
                lifecycle.step(LifecycleEvent::Drained).map_err(anyhow::Error::from)?;
                console.say("Cancelled.");
                return Ok(RunReport {
                    outcome: RunOutcome::Cancelled,
                    phases: lifecycle.history().to_vec(),
                    units,
                });
            }
        };

        lifecycle.step(LifecycleEvent::AllLaunched).map_err(anyhow::Error::from)?;

        // Entries are registered before any reader starts, so every row
        // begins at the initial status.
        let tracker = StatusTracker::new(
            units.iter().take(launched.len()).map(|u| u.name.clone()),
            &initial_status,
        );

        let mut supervisors = SupervisorSet::new();
        for (id, Launched { process, stdout }) in tracker.ids().zip(launched) {
            let reader = stdout.map(|out| spawn_stdout_reader(out, id, tracker.clone(), parser));
            supervisors.spawn(id, process, reader, tracker.clone());
        }

        console.say(&format!(
            "Waiting for {} process(es) to finish...",
            tracker.len()
        ));

        let view = console.take().map(|surface| LiveView::new(surface, tracker.clone()).spawn());

        let cancelled = tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            _ = supervisors.wait_all() => false,
        };

        let (event, outcome) = if cancelled {
            info!("cancellation requested; draining");
            (LifecycleEvent::CancelRequested, RunOutcome::Cancelled)
        } else {
            info!("all processes exited; draining");
            (LifecycleEvent::AllExited, RunOutcome::Completed)
        };
        lifecycle.step(event).map_err(anyhow::Error::from)?;

        if let Some(view) = view {
            match view.finish().await {
                Ok(surface) => console.restore(surface),
                Err(err) => error!(error = %err, "live view task failed"),
            }
        }

        console.say(match outcome {
            RunOutcome::Completed => "All processes finished.",
            RunOutcome::Cancelled => "Run cancelled.",
        });
        console.say(&format!(
            "- Killing running {} processes...",
            supervisors.running()
        ));

        let requested = supervisors.request_termination();
        info!(requested, "termination requested for running processes");

        let finished = supervisors.into_finished().await;
        let rows = tracker.snapshot();
        let mut units_report = Vec::with_capacity(finished.len());
        for mut done in finished {
            let name = tracker.name(done.id).unwrap_or_default().to_string();

            // Sweeps leftover descendants; a no-op for exited processes.
            match done.process.terminate().await {
                Ok(TerminateOutcome::AlreadyExited) => {}
                Ok(TerminateOutcome::Killed) => {
                    warn!(unit = %name, "process was still running at teardown");
                    done.killed = true;
                }
                Err(err) => warn!(unit = %name, error = %err, "failed to terminate process"),
            }

            let exit = match done.process.wait().await {
                Ok(exit) => Some(exit),
                Err(err) => {
                    warn!(unit = %name, error = %err, "failed to wait for process");
                    done.exit
                }
            };

            units_report.push(UnitReport {
                status: rows
                    .get(done.id.0)
                    .map(|r| r.status.clone())
                    .unwrap_or_default(),
                name,
                exit,
                killed: done.killed,
            });
        }

        lifecycle.step(LifecycleEvent::Drained).map_err(anyhow::Error::from)?;

        for unit in &units_report {
            match unit.exit {
                Some(exit) => info!(unit = %unit.name, %exit, killed = unit.killed, "final state"),
                None => warn!(unit = %unit.name, "exit status unknown"),
            }
        }
        console.say("Done.");

        Ok(RunReport {
            outcome,
            phases: lifecycle.history().to_vec(),
            units: units_report,
        })
    }
}

enum LaunchPhase {
    Complete(Vec<Launched>),
    Failed { launched: Vec<Launched>, error: LaunchError },
    Cancelled(Vec<Launched>),
}

/// Launch units in order, stopping at the first failure or cancellation.
fn launch_all<L: ProcessLauncher>(
    launcher: &L,
    units: &[RunnableUnit],
    cancel: &CancellationToken,
) -> LaunchPhase {
    let mut launched = Vec::with_capacity(units.len());

    for unit in units {
        if cancel.is_cancelled() {
            info!(launched = launched.len(), "cancelled while launching");
            return LaunchPhase::Cancelled(launched);
        }

        match launcher.launch(unit) {
            Ok(l) => launched.push(l),
            Err(error) => {
                error!(unit = %unit.name, error = %error, "launch failed; aborting run");
                return LaunchPhase::Failed { launched, error };
            }
        }
    }

    LaunchPhase::Complete(launched)
}

/// Tear down processes that never got a supervisor.
async fn drain_unsupervised(launched: Vec<Launched>) -> Vec<(Option<ProcessExit>, bool)> {
    let mut out = Vec::with_capacity(launched.len());

    for Launched { mut process, stdout } in launched {
        drop(stdout);

        let killed = match process.terminate().await {
            Ok(outcome) => outcome == TerminateOutcome::Killed,
            Err(err) => {
                warn!(pid = ?process.pid(), error = %err, "failed to terminate process");
                false
            }
        };

        let exit = match process.wait().await {
            Ok(exit) => Some(exit),
            Err(err) => {
                warn!(pid = ?process.pid(), error = %err, "failed to wait for process");
                None
            }
        };

        out.push((exit, killed));
    }

    out
}

async fn drain_into_reports(
    units: &[RunnableUnit],
    launched: Vec<Launched>,
    status: &str,
) -> Vec<UnitReport> {
    drain_unsupervised(launched)
        .await
        .into_iter()
        .zip(units)
        .map(|((exit, killed), unit)| UnitReport {
            name: unit.name.clone(),
            status: status.to_string(),
            exit,
            killed,
        })
        .collect()
}

/// The surface while the orchestrator owns it.
///
/// It is lent to the live view during `Watching`; if that task dies the
/// remaining messages are only logged.
struct Console<S> {
    surface: Option<S>,
}

impl<S: ViewSurface> Console<S> {
    fn new(surface: S) -> Self {
        Self {
            surface: Some(surface),
        }
    }

    fn take(&mut self) -> Option<S> {
        self.surface.take()
    }

    fn restore(&mut self, surface: S) {
        self.surface = Some(surface);
    }

    fn say(&mut self, text: &str) {
        match self.surface.as_mut() {
            Some(surface) => {
                if let Err(err) = surface.message(text) {
                    warn!(error = %err, "failed to write status line");
                }
            }
            None => info!("{text}"),
        }
    }
}
