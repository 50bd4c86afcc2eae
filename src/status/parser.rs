// src/status/parser.rs

//! Extracts a short status token from a raw stdout line.
//!
//! Children are expected to print progress as `[timestamp] message`. Long
//! lines (stack traces, verbose logs) and lines without a `]` marker are
//! noise and produce no update.

/// Lines this long (in characters) or longer are discarded.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusParser {
    max_line_length: usize,
}

impl Default for StatusParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl StatusParser {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Return the status token for `line`, or `None` if the line carries no
    /// update.
    pub fn parse(&self, line: &str) -> Option<String> {
        if line.chars().count() >= self.max_line_length {
            return None;
        }

        let close = line.find(']')?;
        // Start at the `[` that opens the first marker, if there is one.
        let start = line[..close].rfind('[').unwrap_or(close);

        Some(
            line[start..]
                .chars()
                .filter(|c| *c != '[' && *c != ']')
                .collect(),
        )
    }
}

/// Parse with the default line-length limit.
pub fn parse_status_line(line: &str) -> Option<String> {
    StatusParser::default().parse(line)
}
