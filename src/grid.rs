//! The current result plus a filtered, sorted view over it.
//!
//! The snapshot itself is never modified; every filter or sort change recomputes the list of
//! visible row indices from scratch.

use std::cmp::Ordering;
use std::iter::Peekable;

use crate::error::GridError;
use crate::value::{CellValue, QueryResult, Row};

pub const NO_ROWS_MESSAGE: &str = "Query returned no rows.";
pub const NO_MATCHES_MESSAGE: &str = "No rows match the current filters.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    Descending,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub column: Option<usize>,
    pub direction: SortDirection,
}

#[derive(Debug, Default)]
pub struct ResultGrid {
    snapshot: Option<QueryResult>,
    /// Lowercased display text, same shape as the snapshot rows.
    lowered: Vec<Vec<String>>,
    global_filter: String,
    column_filters: Vec<String>,
    sort: SortState,
    visible: Vec<usize>,
}

impl ResultGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot and reset filters and sort.
    pub fn ingest(&mut self, result: QueryResult) {
        self.lowered = result
            .rows
            .iter()
            .map(|row| row.display.iter().map(|d| d.to_lowercase()).collect())
            .collect();
        self.global_filter.clear();
        self.column_filters = vec![String::new(); result.width()];
        self.sort = SortState::default();
        self.snapshot = Some(result);
        self.rederive();
    }

    pub fn snapshot(&self) -> Option<&QueryResult> {
        self.snapshot.as_ref()
    }

    pub fn columns(&self) -> &[String] {
        self.snapshot
            .as_ref()
            .map(|s| s.columns.as_slice())
            .unwrap_or(&[])
    }

    fn width(&self) -> usize {
        self.columns().len()
    }

    fn check_column(&self, index: usize) -> Result<(), GridError> {
        let width = self.width();
        if index < width {
            Ok(())
        } else {
            Err(GridError::ColumnOutOfRange { index, width })
        }
    }

    /// Resolve a column by exact name, then case-insensitively, then as a 0-based index.
    pub fn column_index(&self, key: &str) -> Result<usize, GridError> {
        let columns = self.columns();
        if let Some(i) = columns.iter().position(|c| c == key) {
            return Ok(i);
        }
        if let Some(i) = columns.iter().position(|c| c.eq_ignore_ascii_case(key)) {
            return Ok(i);
        }
        match key.trim().parse::<usize>() {
            Ok(index) => self.check_column(index).map(|_| index),
            Err(_) => Err(GridError::UnknownColumn(key.to_string())),
        }
    }

    pub fn global_filter(&self) -> &str {
        &self.global_filter
    }

    pub fn set_global_filter(&mut self, text: &str) {
        self.global_filter = text.to_string();
        self.rederive();
    }

    pub fn column_filters(&self) -> &[String] {
        &self.column_filters
    }

    pub fn set_column_filter(&mut self, index: usize, text: &str) -> Result<(), GridError> {
        self.check_column(index)?;
        self.column_filters[index] = text.to_string();
        self.rederive();
        Ok(())
    }

    /// Clear the global filter and every column filter. Sort is kept.
    pub fn clear_filters(&mut self) {
        self.global_filter.clear();
        self.column_filters.iter_mut().for_each(String::clear);
        self.rederive();
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    /// Header click: a new column sorts ascending, then descending, then back to natural order.
    pub fn toggle_sort(&mut self, index: usize) -> Result<SortState, GridError> {
        self.check_column(index)?;
        self.sort = match self.sort {
            SortState {
                column: Some(c),
                direction: SortDirection::Ascending,
            } if c == index => SortState {
                column: Some(index),
                direction: SortDirection::Descending,
            },
            SortState {
                column: Some(c),
                direction: SortDirection::Descending,
            } if c == index => SortState::default(),
            _ => SortState {
                column: Some(index),
                direction: SortDirection::Ascending,
            },
        };
        self.rederive();
        Ok(self.sort)
    }

    /// Set the sort directly.
    pub fn set_sort(&mut self, index: usize, direction: SortDirection) -> Result<(), GridError> {
        self.check_column(index)?;
        self.sort = match direction {
            SortDirection::None => SortState::default(),
            _ => SortState {
                column: Some(index),
                direction,
            },
        };
        self.rederive();
        Ok(())
    }

    /// Indices into the snapshot rows, in display order.
    pub fn visible_indices(&self) -> &[usize] {
        &self.visible
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> + '_ {
        let rows = self
            .snapshot
            .as_ref()
            .map(|s| s.rows.as_slice())
            .unwrap_or(&[]);
        self.visible.iter().map(move |&i| &rows[i])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn total_len(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |s| s.row_count())
    }

    /// `"10 rows"`, `"1 row"`, or `"3 of 10 rows"` when filters hide some.
    pub fn row_count_label(&self) -> String {
        let total = self.total_len();
        let visible = self.visible_len();
        let noun = if total == 1 { "row" } else { "rows" };
        if visible == total {
            format!("{} {}", total, noun)
        } else {
            format!("{} of {} {}", visible, total, noun)
        }
    }

    /// Message for an empty view, `None` when rows are visible or nothing has been ingested.
    pub fn empty_message(&self) -> Option<&'static str> {
        let snapshot = self.snapshot.as_ref()?;
        if snapshot.is_empty() {
            Some(NO_ROWS_MESSAGE)
        } else if self.visible.is_empty() {
            Some(NO_MATCHES_MESSAGE)
        } else {
            None
        }
    }

    fn rederive(&mut self) {
        let Some(snapshot) = self.snapshot.as_ref() else {
            self.visible.clear();
            return;
        };

        let global = self.global_filter.to_lowercase();
        let column_filters: Vec<(usize, String)> = self
            .column_filters
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_empty())
            .map(|(i, f)| (i, f.to_lowercase()))
            .collect();

        let mut visible: Vec<usize> = self
            .lowered
            .iter()
            .enumerate()
            .filter(|(_, cells)| {
                (global.is_empty() || cells.iter().any(|c| c.contains(&global)))
                    && column_filters
                        .iter()
                        .all(|(col, needle)| cells[*col].contains(needle.as_str()))
            })
            .map(|(i, _)| i)
            .collect();

        if let SortState {
            column: Some(col),
            direction,
        } = self.sort
        {
            if direction != SortDirection::None {
                let rows = &snapshot.rows;
                visible.sort_by(|&a, &b| {
                    let ord = compare_cells(
                        &rows[a].raw[col],
                        &rows[a].display[col],
                        &rows[b].raw[col],
                        &rows[b].display[col],
                    );
                    match direction {
                        SortDirection::Descending => ord.reverse(),
                        _ => ord,
                    }
                });
            }
        }

        self.visible = visible;
    }
}

/// Ordering used when sorting a column.
///
/// Equal values tie. Two finite numbers compare numerically, two temporals by instant.
/// Everything else falls back to [`natural_cmp`] on the display text.
pub fn compare_cells(a: &CellValue, a_display: &str, b: &CellValue, b_display: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (a, b) {
        (CellValue::Int(x), CellValue::Int(y)) => return x.cmp(y),
        (CellValue::Temporal(x), CellValue::Temporal(y)) => return x.cmp(y),
        _ => {}
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        if x.is_finite() && y.is_finite() {
            if let Some(ord) = x.partial_cmp(&y) {
                return ord;
            }
        }
    }
    natural_cmp(a_display, b_display)
}

/// Case-insensitive comparison that orders runs of digits by value (`"row2" < "row10"`).
///
/// Non-digit characters compare by lowercased code point. There is no locale
/// collation, so `"é"` sorts after `"z"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().flat_map(char::to_lowercase).peekable();
    let mut right = b.chars().flat_map(char::to_lowercase).peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let l = take_digits(&mut left);
                let r = take_digits(&mut right);
                let ord = compare_digit_runs(&l, &r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits<I: Iterator<Item = char>>(it: &mut Peekable<I>) -> String {
    let mut digits = String::new();
    while let Some(c) = it.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_result(columns: &[&str], rows: &[&[&str]]) -> QueryResult {
        QueryResult {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| Row {
                    raw: r.iter().map(|v| CellValue::Text(v.to_string())).collect(),
                    display: r.iter().map(|v| v.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn int_result(values: &[i64]) -> QueryResult {
        QueryResult {
            columns: vec!["n".to_string()],
            rows: values
                .iter()
                .map(|v| Row {
                    raw: vec![CellValue::Int(*v)],
                    display: vec![v.to_string()],
                })
                .collect(),
        }
    }

    fn visible_display(grid: &ResultGrid, col: usize) -> Vec<String> {
        grid.visible_rows().map(|r| r.display[col].clone()).collect()
    }

    #[test]
    fn test_neutral_state_preserves_order() {
        let mut grid = ResultGrid::new();
        grid.ingest(int_result(&[3, 1, 2]));
        assert_eq!(grid.visible_indices(), &[0, 1, 2]);
        assert_eq!(grid.column_filters().len(), 1);
        assert_eq!(grid.empty_message(), None);
        assert_eq!(grid.row_count_label(), "3 rows");
    }

    #[test]
    fn test_filtered_label() {
        let values: Vec<i64> = (1..=10).collect();
        let mut grid = ResultGrid::new();
        grid.ingest(int_result(&values));
        // only 1 and 10 contain "1"
        grid.set_global_filter("1");
        assert_eq!(grid.visible_len(), 2);
        grid.set_global_filter("");
        grid.set_column_filter(0, "").unwrap();
        assert_eq!(grid.row_count_label(), "10 rows");

        let mut grid = ResultGrid::new();
        grid.ingest(text_result(
            &["name"],
            &[
                &["ann"], &["bob"], &["anna"], &["cy"], &["dan"], &["eve"], &["fay"],
                &["gus"], &["hal"], &["ivy"],
            ],
        ));
        grid.set_global_filter("AN");
        assert_eq!(grid.visible_len(), 3);
        assert_eq!(grid.row_count_label(), "3 of 10 rows");
    }

    #[test]
    fn test_single_row_label() {
        let mut grid = ResultGrid::new();
        grid.ingest(int_result(&[7]));
        assert_eq!(grid.row_count_label(), "1 row");
    }

    #[test]
    fn test_global_and_column_filters_combine() {
        let mut grid = ResultGrid::new();
        grid.ingest(text_result(
            &["city", "team"],
            &[&["Oslo", "red"], &["Lima", "blue"], &["Osaka", "blue"]],
        ));
        grid.set_global_filter("o");
        assert_eq!(grid.visible_len(), 2);
        grid.set_column_filter(1, "BLU").unwrap();
        assert_eq!(visible_display(&grid, 0), vec!["Osaka"]);
        grid.clear_filters();
        assert_eq!(grid.visible_len(), 3);
        assert_eq!(grid.global_filter(), "");
    }

    #[test]
    fn test_empty_messages() {
        let mut grid = ResultGrid::new();
        assert_eq!(grid.empty_message(), None);
        grid.ingest(int_result(&[]));
        assert_eq!(grid.empty_message(), Some(NO_ROWS_MESSAGE));
        grid.ingest(int_result(&[1, 2]));
        grid.set_global_filter("zzz");
        assert_eq!(grid.empty_message(), Some(NO_MATCHES_MESSAGE));
        assert_eq!(grid.row_count_label(), "0 of 2 rows");
    }

    #[test]
    fn test_column_out_of_range() {
        let mut grid = ResultGrid::new();
        grid.ingest(int_result(&[1]));
        assert!(matches!(
            grid.set_column_filter(1, "x"),
            Err(GridError::ColumnOutOfRange { index: 1, width: 1 })
        ));
        assert!(grid.toggle_sort(5).is_err());
        assert!(ResultGrid::new().toggle_sort(0).is_err());
    }

    #[test]
    fn test_three_toggles_restore_order() {
        let mut grid = ResultGrid::new();
        grid.ingest(int_result(&[3, 10, 2, 10, 1]));
        let original = grid.visible_indices().to_vec();

        let s = grid.toggle_sort(0).unwrap();
        assert_eq!(s.direction, SortDirection::Ascending);
        assert_eq!(visible_display(&grid, 0), vec!["1", "2", "3", "10", "10"]);
        // stable: the two 10s keep their original relative order
        assert_eq!(&grid.visible_indices()[3..], &[1, 3]);

        let s = grid.toggle_sort(0).unwrap();
        assert_eq!(s.direction, SortDirection::Descending);
        assert_eq!(visible_display(&grid, 0), vec!["10", "10", "3", "2", "1"]);
        assert_eq!(&grid.visible_indices()[..2], &[1, 3]);

        let s = grid.toggle_sort(0).unwrap();
        assert_eq!(s, SortState::default());
        assert_eq!(grid.visible_indices(), original.as_slice());
    }

    #[test]
    fn test_switching_column_starts_ascending() {
        let mut grid = ResultGrid::new();
        grid.ingest(text_result(&["a", "b"], &[&["1", "y"], &["2", "x"]]));
        grid.toggle_sort(0).unwrap();
        grid.toggle_sort(0).unwrap();
        let s = grid.toggle_sort(1).unwrap();
        assert_eq!(s.column, Some(1));
        assert_eq!(s.direction, SortDirection::Ascending);
        assert_eq!(visible_display(&grid, 1), vec!["x", "y"]);
    }

    #[test]
    fn test_ingest_resets_state() {
        let mut grid = ResultGrid::new();
        grid.ingest(int_result(&[2, 1]));
        grid.toggle_sort(0).unwrap();
        grid.set_global_filter("2");
        grid.ingest(text_result(&["x", "y"], &[&["a", "b"]]));
        assert_eq!(grid.sort_state(), SortState::default());
        assert_eq!(grid.global_filter(), "");
        assert_eq!(grid.column_filters(), &[String::new(), String::new()]);
    }

    #[test]
    fn test_compare_cells() {
        use CellValue::*;
        assert_eq!(compare_cells(&Int(2), "2", &Int(10), "10"), Ordering::Less);
        assert_eq!(
            compare_cells(&Float(2.5), "2.5", &Int(2), "2"),
            Ordering::Greater
        );
        assert_eq!(
            compare_cells(&Temporal(5), "b", &Temporal(1), "a"),
            Ordering::Greater
        );
        // NaN falls back to text
        assert_eq!(
            compare_cells(&Float(f64::NAN), "NaN", &Float(1.0), "1.0"),
            Ordering::Greater
        );
        assert_eq!(compare_cells(&Null, "", &Int(1), "1"), Ordering::Less);
        assert_eq!(compare_cells(&Null, "", &Null, ""), Ordering::Equal);
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("row2", "row10"), Ordering::Less);
        assert_eq!(natural_cmp("Apple", "apple"), Ordering::Equal);
        assert_eq!(natural_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(natural_cmp("a01", "a1"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
        assert_eq!(natural_cmp("", "x"), Ordering::Less);
    }

    #[test]
    fn test_natural_cmp_uses_code_points_outside_ascii() {
        assert_eq!(natural_cmp("zebra", "éclair"), Ordering::Less);
        assert_eq!(natural_cmp("Zebra", "éclair"), Ordering::Less);
        assert_eq!(natural_cmp("Éclair", "éclair"), Ordering::Equal);
        assert_eq!(natural_cmp("a_b", "a-b"), Ordering::Greater);
    }

    #[test]
    fn test_column_index_lookup() {
        let mut grid = ResultGrid::new();
        grid.ingest(text_result(&["Name", "age"], &[]));
        assert_eq!(grid.column_index("Name").unwrap(), 0);
        assert_eq!(grid.column_index("AGE").unwrap(), 1);
        assert_eq!(grid.column_index("1").unwrap(), 1);
        assert!(matches!(
            grid.column_index("2"),
            Err(GridError::ColumnOutOfRange { .. })
        ));
        assert!(matches!(
            grid.column_index("zip"),
            Err(GridError::UnknownColumn(_))
        ));
    }
}
