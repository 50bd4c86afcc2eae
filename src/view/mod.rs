// src/view/mod.rs

//! Live status table.
//!
//! [`LiveView`] subscribes to the [`StatusTracker`] and redraws the table on
//! a [`ViewSurface`] after every change. Bursts of updates are coalesced: a
//! redraw always uses the latest snapshot, so the final frame reflects the
//! last known status of every entry.

pub mod table;
pub mod terminal;

use std::io;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::{trace, warn};

use crate::status::{StatusRow, StatusTracker};

pub use table::render_table;
pub use terminal::TerminalSurface;

/// Where the run's user-facing output goes.
pub trait ViewSurface: Send {
    /// Replace the previously drawn table with a new frame.
    fn draw_table(&mut self, rows: &[StatusRow]) -> io::Result<()>;

    /// Draw the last frame of the table; later output goes below it.
    fn finish_table(&mut self, rows: &[StatusRow]) -> io::Result<()> {
        self.draw_table(rows)
    }

    /// Print a plain status line.
    fn message(&mut self, text: &str) -> io::Result<()>;
}

pub struct LiveView<S> {
    surface: S,
    tracker: StatusTracker,
}

impl<S: ViewSurface + 'static> LiveView<S> {
    pub fn new(surface: S, tracker: StatusTracker) -> Self {
        Self { surface, tracker }
    }

    /// Run the view on its own task until the handle is finished.
    pub fn spawn(self) -> LiveViewHandle<S> {
        let (stop_tx, stop_rx) = oneshot::channel();
        LiveViewHandle {
            stop: stop_tx,
            join: tokio::spawn(self.run(stop_rx)),
        }
    }

    /// Draw once, redraw on every tracker change, draw the final frame when
    /// `stop` fires, and hand the surface back.
    pub async fn run(mut self, mut stop: oneshot::Receiver<()>) -> S {
        let mut changes = self.tracker.subscribe();
        changes.borrow_and_update();
        self.draw();

        loop {
            tokio::select! {
                biased;

                _ = &mut stop => break,

                res = changes.changed() => {
                    if res.is_err() {
                        break;
                    }
                    let version = *changes.borrow_and_update();
                    trace!(version, "status changed; redrawing");
                    self.draw();
                }
            }
        }

        let rows = self.tracker.snapshot();
        if let Err(err) = self.surface.finish_table(&rows) {
            warn!(error = %err, "failed to draw final status table");
        }
        self.surface
    }

    fn draw(&mut self) {
        let rows = self.tracker.snapshot();
        if let Err(err) = self.surface.draw_table(&rows) {
            warn!(error = %err, "failed to draw status table");
        }
    }
}

/// A [`LiveView`] running in the background.
pub struct LiveViewHandle<S> {
    stop: oneshot::Sender<()>,
    join: JoinHandle<S>,
}

impl<S> LiveViewHandle<S> {
    /// Stop redrawing, wait for the final frame, and take the surface back.
    pub async fn finish(self) -> Result<S, JoinError> {
        let _ = self.stop.send(());
        self.join.await
    }
}
