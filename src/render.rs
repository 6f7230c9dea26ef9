//! Plain-text rendering of the result grid for terminal hosts.

use std::fmt::Write;

use crate::config::DisplayConfig;
use crate::grid::{ResultGrid, SortDirection};
use crate::history::HistoryLedger;
use crate::loaders::ColumnSchema;

const ELLIPSIS: char = '…';
const COLUMN_GAP: &str = "  ";

/// Render the visible rows of `grid` as an aligned table followed by its row count label.
///
/// Columns are as wide as their widest shown value, capped at `max_column_width`. At most
/// `max_rows` rows are printed; a trailing line notes how many were cut.
pub fn render_grid(grid: &ResultGrid, display: &DisplayConfig) -> String {
    let mut out = String::new();
    let Some(snapshot) = grid.snapshot() else {
        return out;
    };

    if snapshot.width() == 0 {
        let _ = writeln!(out, "(no columns)");
        return out;
    }

    let sort = grid.sort_state();
    let headers: Vec<String> = snapshot
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| match sort.column {
            Some(c) if c == i && sort.direction == SortDirection::Ascending => {
                format!("{} ▲", name)
            }
            Some(c) if c == i && sort.direction == SortDirection::Descending => {
                format!("{} ▼", name)
            }
            _ => name.clone(),
        })
        .collect();

    let rows: Vec<&[String]> = grid
        .visible_rows()
        .take(display.max_rows)
        .map(|row| row.display.as_slice())
        .collect();

    let max_width = display.max_column_width.max(1);
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| row.get(i).map_or(0, |v| display_width(v)))
                .chain(std::iter::once(display_width(header)))
                .max()
                .unwrap_or(0)
                .min(max_width)
        })
        .collect();

    write_line(&mut out, headers.iter().map(String::as_str), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in &rows {
        write_line(&mut out, row.iter().map(String::as_str), &widths);
    }

    if let Some(message) = grid.empty_message() {
        let _ = writeln!(out, "{}", message);
    }
    let hidden = grid.visible_len().saturating_sub(rows.len());
    if hidden > 0 {
        let _ = writeln!(out, "... {} more not shown", hidden);
    }
    let _ = writeln!(out, "{}", grid.row_count_label());
    out
}

pub fn render_schema(schema: &[ColumnSchema]) -> String {
    let width = schema
        .iter()
        .map(|c| display_width(&c.name))
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for column in schema {
        let _ = writeln!(out, "{:<width$}  {}", column.name, column.data_type, width = width);
    }
    out
}

/// Newest first, one line per entry.
pub fn render_history(history: &HistoryLedger) -> String {
    let mut out = String::new();
    for entry in history.entries() {
        let outcome = match &entry.error {
            Some(error) => format!("error: {}", error),
            None => format!(
                "{} {}",
                entry.row_count,
                if entry.row_count == 1 { "row" } else { "rows" }
            ),
        };
        let _ = writeln!(
            out,
            "#{} [{}] {} ms, {}: {}",
            entry.id,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.duration_ms,
            outcome,
            entry.sql.replace('\n', " ")
        );
    }
    out
}

fn write_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &width)| pad(&truncate(cell, width), width))
        .collect();
    let _ = writeln!(out, "{}", line.join(COLUMN_GAP).trim_end());
}

fn display_width(text: &str) -> usize {
    text.chars().count()
}

/// Cut `text` to `width` characters, marking the cut with an ellipsis. Newlines become spaces.
fn truncate(text: &str, width: usize) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    if display_width(&flat) <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(1)).collect();
    cut.push(ELLIPSIS);
    cut
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(text));
    format!("{}{}", text, " ".repeat(fill))
}
