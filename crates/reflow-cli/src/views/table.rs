use comfy_table::{Attribute, Cell, Color, Row, Table};
use reflow_core::conflict::{Conflict, Severity};
use reflow_core::models::Series;
use reflow_core::reflow::Assignment;

pub fn display_series(series: &[Series]) {
    if series.is_empty() {
        println!("No series found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Start", "End", "Tags", "Locked"]);

    for s in series {
        let mut row = Row::new();
        row.add_cell(Cell::new(&s.id.to_string()[..8]));
        let mut title_cell = Cell::new(&s.title);
        if s.locked {
            title_cell = title_cell.add_attribute(Attribute::Bold).fg(Color::DarkGrey);
        }
        row.add_cell(title_cell);
        row.add_cell(Cell::new(s.start_date.map(|d| d.to_canonical_string()).unwrap_or_else(|| "none".into())));
        row.add_cell(Cell::new(s.end_date.map(|d| d.to_canonical_string()).unwrap_or_else(|| "none".into())));
        row.add_cell(Cell::new(if s.tags.is_empty() { "none".to_string() } else { s.tags.join(", ") }));
        row.add_cell(Cell::new(if s.locked { "yes" } else { "no" }));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_assignments(assignments: &[Assignment]) {
    if assignments.is_empty() {
        println!("No assignments.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Series", "Date", "Time", "Title"]);

    for a in assignments {
        let mut row = Row::new();
        row.add_cell(Cell::new(&a.series_id.to_string()[..8]));
        row.add_cell(Cell::new(a.date.to_canonical_string()));
        row.add_cell(Cell::new(a.time.time().to_canonical_string()));
        row.add_cell(Cell::new(a.title.as_deref().unwrap_or("-")));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_conflicts(conflicts: &[Conflict]) {
    if conflicts.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Severity", "Kind", "Message"]);

    for c in conflicts {
        let mut row = Row::new();
        let severity_cell = match c.severity {
            Severity::Error => Cell::new("error").fg(Color::Red).add_attribute(Attribute::Bold),
            Severity::Warning => Cell::new("warning").fg(Color::Yellow),
        };
        row.add_cell(severity_cell);
        row.add_cell(Cell::new(format!("{:?}", c.kind)));
        row.add_cell(Cell::new(&c.message));
        table.add_row(row);
    }

    println!("{table}");
}
