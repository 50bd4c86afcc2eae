// src/view/table.rs

use tabled::settings::peaker::PriorityMax;
use tabled::settings::{Style, Width};
use tabled::{Table, Tabled};

use crate::status::StatusRow;

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Render the two-column `Project | Status` table with ASCII borders.
///
/// With `max_width` the widest column is cut down until every line fits,
/// so a terminal never wraps a row.
pub fn render_table(rows: &[StatusRow], max_width: Option<usize>) -> String {
    let mut table = Table::new(rows.iter().map(|row| TableRow {
        project: row.name.clone(),
        status: row.status.clone(),
    }));
    table.with(Style::ascii());
    if let Some(width) = max_width {
        table.with(Width::truncate(width).suffix("...").priority::<PriorityMax>());
    }
    table.to_string()
}
