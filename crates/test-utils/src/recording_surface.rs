//! A [`ViewSurface`] that keeps everything drawn on it.

use std::io;
use std::sync::{Arc, Mutex};

use migrun::status::StatusRow;
use migrun::view::ViewSurface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Table(Vec<StatusRow>),
    FinalTable(Vec<StatusRow>),
    Message(String),
}

/// Clones share the same frame log, so a test can keep one while the
/// orchestrator owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.frames()
            .into_iter()
            .filter_map(|f| match f {
                Frame::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Every table frame, live and final, in drawing order.
    pub fn tables(&self) -> Vec<Vec<StatusRow>> {
        self.frames()
            .into_iter()
            .filter_map(|f| match f {
                Frame::Table(rows) | Frame::FinalTable(rows) => Some(rows),
                Frame::Message(_) => None,
            })
            .collect()
    }

    pub fn last_table(&self) -> Option<Vec<StatusRow>> {
        self.tables().pop()
    }

    /// Status column of the last table frame.
    pub fn last_statuses(&self) -> Vec<String> {
        self.last_table()
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.status)
            .collect()
    }

    fn push(&self, frame: Frame) {
        self.frames.lock().unwrap().push(frame);
    }
}

impl ViewSurface for RecordingSurface {
    fn draw_table(&mut self, rows: &[StatusRow]) -> io::Result<()> {
        self.push(Frame::Table(rows.to_vec()));
        Ok(())
    }

    fn finish_table(&mut self, rows: &[StatusRow]) -> io::Result<()> {
        self.push(Frame::FinalTable(rows.to_vec()));
        Ok(())
    }

    fn message(&mut self, text: &str) -> io::Result<()> {
        self.push(Frame::Message(text.to_string()));
        Ok(())
    }
}
