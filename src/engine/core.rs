// src/engine/core.rs

//! Pure run lifecycle state machine.
//!
//! `Idle → Launching → Watching → Draining → Done`
//!
//! The async shell ([`super::runtime::Orchestrator`]) feeds it
//! [`LifecycleEvent`]s as things happen. The machine has no Tokio types and
//! performs no IO, so every transition is unit tested directly.

use thiserror::Error;
use tracing::debug;

use super::{DrainReason, RunPhase};

/// Something that moves the run forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The list of units arrived.
    UnitsReceived,
    /// Every unit was started.
    AllLaunched,
    /// A unit could not be started; nothing after it is launched.
    LaunchFailed,
    /// Every launched process reported exit.
    AllExited,
    /// External cancellation.
    CancelRequested,
    /// Every process is confirmed gone.
    Drained,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid lifecycle transition: {event:?} while {from:?}")]
pub struct InvalidTransition {
    pub from: RunPhase,
    pub event: LifecycleEvent,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    phase: RunPhase,
    history: Vec<RunPhase>,
    drain_reason: Option<DrainReason>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            history: vec![RunPhase::Idle],
            drain_reason: None,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Every phase entered so far, starting with `Idle`.
    pub fn history(&self) -> &[RunPhase] {
        &self.history
    }

    /// Why draining started, once it has.
    pub fn drain_reason(&self) -> Option<DrainReason> {
        self.drain_reason
    }

    pub fn is_done(&self) -> bool {
        self.phase == RunPhase::Done
    }

    /// Apply one event and return the phase entered.
    pub fn step(&mut self, event: LifecycleEvent) -> Result<RunPhase, InvalidTransition> {
        use LifecycleEvent as E;
        use RunPhase as P;

        let (next, reason) = match (self.phase, event) {
            (P::Idle, E::UnitsReceived) => (P::Launching, None),
            (P::Launching, E::AllLaunched) => (P::Watching, None),
            (P::Launching, E::LaunchFailed) => (P::Draining, Some(DrainReason::LaunchFailed)),
            (P::Launching, E::CancelRequested) => (P::Draining, Some(DrainReason::Cancelled)),
            (P::Watching, E::AllExited) => (P::Draining, Some(DrainReason::AllExited)),
            (P::Watching, E::CancelRequested) => (P::Draining, Some(DrainReason::Cancelled)),
            (P::Draining, E::Drained) => (P::Done, None),
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        debug!(from = ?self.phase, to = ?next, ?event, "lifecycle transition");

        if reason.is_some() {
            self.drain_reason = reason;
        }
        self.phase = next;
        self.history.push(next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(events: &[LifecycleEvent]) -> Lifecycle {
        let mut lc = Lifecycle::new();
        for ev in events {
            lc.step(*ev).unwrap();
        }
        lc
    }

    #[test]
    fn normal_completion_path() {
        use LifecycleEvent::*;
        let lc = drive(&[UnitsReceived, AllLaunched, AllExited, Drained]);

        assert!(lc.is_done());
        assert_eq!(lc.drain_reason(), Some(DrainReason::AllExited));
        assert_eq!(
            lc.history(),
            &[
                RunPhase::Idle,
                RunPhase::Launching,
                RunPhase::Watching,
                RunPhase::Draining,
                RunPhase::Done
            ]
        );
    }

    #[test]
    fn cancellation_while_watching_still_reaches_done() {
        use LifecycleEvent::*;
        let lc = drive(&[UnitsReceived, AllLaunched, CancelRequested, Drained]);
        assert!(lc.is_done());
        assert_eq!(lc.drain_reason(), Some(DrainReason::Cancelled));
    }

    #[test]
    fn launch_failure_skips_watching() {
        use LifecycleEvent::*;
        let lc = drive(&[UnitsReceived, LaunchFailed, Drained]);

        assert!(lc.is_done());
        assert_eq!(lc.drain_reason(), Some(DrainReason::LaunchFailed));
        assert!(!lc.history().contains(&RunPhase::Watching));
    }

    #[test]
    fn cancellation_during_launch() {
        use LifecycleEvent::*;
        let lc = drive(&[UnitsReceived, CancelRequested, Drained]);
        assert_eq!(lc.drain_reason(), Some(DrainReason::Cancelled));
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let mut lc = Lifecycle::new();
        let err = lc.step(LifecycleEvent::AllExited).unwrap_err();
        assert_eq!(err.from, RunPhase::Idle);
        assert_eq!(lc.phase(), RunPhase::Idle);

        let mut lc = drive(&[LifecycleEvent::UnitsReceived, LifecycleEvent::AllLaunched]);
        lc.step(LifecycleEvent::AllExited).unwrap();
        // Draining is entered once; a late cancellation is not a transition.
        assert!(lc.step(LifecycleEvent::CancelRequested).is_err());
        assert_eq!(lc.drain_reason(), Some(DrainReason::AllExited));
    }

    #[test]
    fn done_is_terminal() {
        use LifecycleEvent::*;
        let mut lc = drive(&[UnitsReceived, AllLaunched, AllExited, Drained]);
        for ev in [UnitsReceived, AllLaunched, LaunchFailed, AllExited, CancelRequested, Drained] {
            assert!(lc.step(ev).is_err());
        }
        assert!(lc.is_done());
    }
}
