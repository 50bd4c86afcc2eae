// src/status/tracker.rs

//! Shared per-process status records.
//!
//! The tracker is created once per run with a fixed set of entries. Reader
//! tasks write status text, supervisors record exits, and the live view
//! takes snapshots. Each entry has its own lock; there is no ordering across
//! entries.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::trace;

use crate::types::ProcessExit;

/// Status shown for every entry before its first parsed line arrives.
pub const DEFAULT_INITIAL_STATUS: &str = "Running...";

/// Index of an entry, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub usize);

/// Point-in-time copy of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub name: String,
    pub status: String,
    pub exit: Option<ProcessExit>,
}

#[derive(Debug)]
struct EntryState {
    status: String,
    exit: Option<ProcessExit>,
}

#[derive(Debug)]
struct Entry {
    name: String,
    state: Mutex<EntryState>,
}

#[derive(Debug)]
struct Inner {
    entries: Vec<Entry>,
    changes: watch::Sender<u64>,
}

/// Cheaply clonable handle to the run's status records.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    inner: Arc<Inner>,
}

impl StatusTracker {
    /// Register one entry per name, all starting at `initial`.
    pub fn new<I, S>(names: I, initial: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = names
            .into_iter()
            .map(|name| Entry {
                name: name.into(),
                state: Mutex::new(EntryState {
                    status: initial.to_string(),
                    exit: None,
                }),
            })
            .collect();

        let (changes, _) = watch::channel(0);

        Self {
            inner: Arc::new(Inner { entries, changes }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntryId> {
        (0..self.len()).map(EntryId)
    }

    pub fn name(&self, id: EntryId) -> Option<&str> {
        self.inner.entries.get(id.0).map(|e| e.name.as_str())
    }

    /// Replace the status text of one entry.
    ///
    /// Returns `false` (and changes nothing) if the entry is unknown or its
    /// process has already been reported exited.
    pub fn update(&self, id: EntryId, text: impl Into<String>) -> bool {
        let Some(entry) = self.inner.entries.get(id.0) else {
            return false;
        };

        {
            let mut state = lock(&entry.state);
            if state.exit.is_some() {
                trace!(unit = %entry.name, "ignoring status update after exit");
                return false;
            }
            state.status = text.into();
        }

        self.notify();
        true
    }

    /// Like [`update`](Self::update), addressing the first entry called `name`.
    pub fn update_named(&self, name: &str, text: impl Into<String>) -> bool {
        match self.inner.entries.iter().position(|e| e.name == name) {
            Some(idx) => self.update(EntryId(idx), text),
            None => false,
        }
    }

    /// Record the OS exit of an entry's process. Only the first call wins.
    pub fn mark_exited(&self, id: EntryId, exit: ProcessExit) {
        let Some(entry) = self.inner.entries.get(id.0) else {
            return;
        };

        {
            let mut state = lock(&entry.state);
            if state.exit.is_some() {
                return;
            }
            state.exit = Some(exit);
        }

        self.notify();
    }

    pub fn is_exited(&self, id: EntryId) -> bool {
        self.inner
            .entries
            .get(id.0)
            .is_some_and(|e| lock(&e.state).exit.is_some())
    }

    /// Ordered copy of every entry.
    pub fn snapshot(&self) -> Vec<StatusRow> {
        self.inner
            .entries
            .iter()
            .map(|entry| {
                let state = lock(&entry.state);
                StatusRow {
                    name: entry.name.clone(),
                    status: state.status.clone(),
                    exit: state.exit,
                }
            })
            .collect()
    }

    /// Receive a notification (a bumped version number) on every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    fn notify(&self) {
        self.inner.changes.send_modify(|version| *version += 1);
    }
}

// Entry critical sections only assign strings; a poisoned lock still holds
// consistent data.
fn lock(state: &Mutex<EntryState>) -> MutexGuard<'_, EntryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
