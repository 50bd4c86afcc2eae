// src/status/mod.rs

//! Child status tracking.
//!
//! - [`parser`] turns raw stdout lines into short status tokens.
//! - [`tracker`] holds the latest token per process and notifies the live
//!   view on every change.

pub mod parser;
pub mod tracker;

pub use parser::{DEFAULT_MAX_LINE_LENGTH, StatusParser, parse_status_line};
pub use tracker::{DEFAULT_INITIAL_STATUS, EntryId, StatusRow, StatusTracker};
