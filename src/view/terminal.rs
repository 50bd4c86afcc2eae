// src/view/terminal.rs

use std::io;

use console::Term;

use crate::status::StatusRow;
use crate::view::ViewSurface;
use crate::view::table::render_table;

/// Live table on stdout.
///
/// On a terminal the table is redrawn in place by clearing the lines of the
/// previous frame. When stdout is redirected only the final frame is
/// written.
#[derive(Debug)]
pub struct TerminalSurface {
    term: Term,
    live: bool,
    /// Lines of the table currently on screen, 0 after any message.
    drawn_lines: usize,
}

impl TerminalSurface {
    pub fn stdout() -> Self {
        let term = Term::stdout();
        let live = term.is_term();
        Self {
            term,
            live,
            drawn_lines: 0,
        }
    }

    fn redraw(&mut self, rows: &[StatusRow]) -> io::Result<()> {
        // Rows wider than the terminal would wrap and break in-place redraw.
        let width = self.term.size_checked().map(|(_, cols)| usize::from(cols));
        let table = render_table(rows, width);
        if self.drawn_lines > 0 {
            self.term.clear_last_lines(self.drawn_lines)?;
        }
        self.term.write_line(&table)?;
        self.drawn_lines = table.lines().count();
        Ok(())
    }
}

impl ViewSurface for TerminalSurface {
    fn draw_table(&mut self, rows: &[StatusRow]) -> io::Result<()> {
        if !self.live {
            return Ok(());
        }
        self.redraw(rows)
    }

    fn finish_table(&mut self, rows: &[StatusRow]) -> io::Result<()> {
        self.redraw(rows)?;
        self.drawn_lines = 0;
        Ok(())
    }

    fn message(&mut self, text: &str) -> io::Result<()> {
        self.term.write_line(text)?;
        self.drawn_lines = 0;
        Ok(())
    }
}
