// src/engine/mod.rs

//! Orchestration engine.
//!
//! The lifecycle state machine lives in [`core`]; the async shell that
//! launches processes, waits on them and tears them down is implemented in
//! [`runtime`].

use crate::types::ProcessExit;

/// Phase of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Launching,
    Watching,
    Draining,
    Done,
}

/// Why the run entered `Draining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
    AllExited,
    Cancelled,
    LaunchFailed,
}

/// How a run that reached `Done` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every process exited on its own.
    Completed,
    /// Cancellation arrived before that.
    Cancelled,
}

/// Final state of one launched unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub name: String,
    /// Last status shown in the table.
    pub status: String,
    /// `None` only if the OS could not be asked for the exit status.
    pub exit: Option<ProcessExit>,
    /// The process was still running when it was killed.
    pub killed: bool,
}

/// Summary of a run that reached `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Phases entered, in order; always ends with [`RunPhase::Done`].
    pub phases: Vec<RunPhase>,
    /// One entry per launched unit, in launch order.
    pub units: Vec<UnitReport>,
}

impl RunReport {
    /// Number of processes that had to be killed while running.
    pub fn killed(&self) -> usize {
        self.units.iter().filter(|u| u.killed).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.units
            .iter()
            .all(|u| u.exit.is_some_and(|e| e.success()))
    }

    /// Process exit code for the binary: 0 when every unit completed
    /// successfully, 1 when some unit failed, 130 when cancelled.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Cancelled => 130,
            RunOutcome::Completed if self.all_succeeded() => 0,
            RunOutcome::Completed => 1,
        }
    }
}

pub mod core;
pub mod runtime;

pub use self::core::{InvalidTransition, Lifecycle, LifecycleEvent};
pub use self::runtime::Orchestrator;

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(code: Option<i32>, killed: bool) -> UnitReport {
        UnitReport {
            name: "u".to_string(),
            status: "Running...".to_string(),
            exit: code.map(ProcessExit::with_code),
            killed,
        }
    }

    fn report(outcome: RunOutcome, units: Vec<UnitReport>) -> RunReport {
        RunReport {
            outcome,
            phases: vec![RunPhase::Done],
            units,
        }
    }

    #[test]
    fn exit_codes() {
        assert_eq!(report(RunOutcome::Completed, vec![]).exit_code(), 0);
        assert_eq!(
            report(RunOutcome::Completed, vec![unit(Some(0), false)]).exit_code(),
            0
        );
        assert_eq!(
            report(RunOutcome::Completed, vec![unit(Some(0), false), unit(Some(2), false)])
                .exit_code(),
            1
        );
        assert_eq!(
            report(RunOutcome::Completed, vec![unit(None, false)]).exit_code(),
            1
        );
        assert_eq!(
            report(RunOutcome::Cancelled, vec![unit(Some(0), false)]).exit_code(),
            130
        );
    }

    #[test]
    fn killed_counts_only_running_kills() {
        let r = report(
            RunOutcome::Cancelled,
            vec![unit(Some(0), false), unit(None, true), unit(None, true)],
        );
        assert_eq!(r.killed(), 2);
    }
}
