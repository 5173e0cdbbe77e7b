//! Row ordering state with undo/redo.
//!
//! An `OrderSession` owns the display rows of a loaded document together with
//! the sort indicator. Every state-changing call records a checkpoint first,
//! and `current_permutation` turns the final row order back into entry indices
//! for `FilterDocument::reorder`.

use crate::checkpoint::CheckpointStack;
use crate::error::ValidationError;
use crate::filter_document::{Column, DisplayRow};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Direction of a column sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => f.write_str("asc"),
            SortDirection::Descending => f.write_str("desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!(
                "unknown sort direction '{}': expected asc or desc",
                other
            )),
        }
    }
}

/// Which column the rows were last sorted by, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortIndicator {
    pub column: Option<Column>,
    pub direction: SortDirection,
}

/// Saved ordering state: row texts plus the sort indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    rows: Vec<DisplayRow>,
    indicator: SortIndicator,
}

/// Default comparator for a column.
///
/// Priorities compare numerically; every other column compares as text.
pub fn default_comparator(column: Column) -> fn(&str, &str) -> Ordering {
    match column {
        Column::Priority => compare_numeric,
        _ => compare_text,
    }
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

/// Current row order of an editing session.
#[derive(Debug, Clone)]
pub struct OrderSession {
    rows: Vec<DisplayRow>,
    indicator: SortIndicator,
    history: CheckpointStack<Snapshot>,
}

impl OrderSession {
    pub fn new(rows: Vec<DisplayRow>) -> Self {
        Self::with_max_depth(rows, None)
    }

    /// Creates a session whose history keeps at most `max_depth` checkpoints.
    pub fn with_max_depth(rows: Vec<DisplayRow>, max_depth: Option<usize>) -> Self {
        Self {
            rows,
            indicator: SortIndicator::default(),
            history: CheckpointStack::with_max_depth(max_depth),
        }
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn indicator(&self) -> SortIndicator {
        self.indicator
    }

    pub fn undo_count(&self) -> usize {
        self.history.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.history.redo_count()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            rows: self.rows.clone(),
            indicator: self.indicator,
        }
    }

    fn take_snapshot(&mut self) -> Snapshot {
        Snapshot {
            rows: std::mem::take(&mut self.rows),
            indicator: self.indicator,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.rows = snapshot.rows;
        self.indicator = snapshot.indicator;
    }

    /// Exchanges the whole rows at positions `i` and `j` (0-based).
    ///
    /// Swapping a row with itself changes nothing and records no checkpoint.
    /// Returns whether the order changed.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::RowOutOfRange` if either position does not
    /// exist; nothing is recorded in that case.
    pub fn swap(&mut self, i: usize, j: usize) -> Result<bool, ValidationError> {
        let rows = self.rows.len();
        for row in [i, j] {
            if row >= rows {
                return Err(ValidationError::RowOutOfRange { row, rows });
            }
        }
        if i == j {
            return Ok(false);
        }

        self.history.push(self.snapshot());
        self.rows.swap(i, j);
        debug!(i, j, undo = self.history.undo_count(), "swapped rows");
        Ok(true)
    }

    /// Stable sort of the rows by `column` using `comparator` on cell text.
    ///
    /// Rows whose keys compare equal keep their relative order, in both
    /// directions.
    pub fn sort_by<F>(&mut self, column: Column, direction: SortDirection, mut comparator: F)
    where
        F: FnMut(&str, &str) -> Ordering,
    {
        self.history.push(self.snapshot());

        self.rows.sort_by(|a, b| {
            let ordering = comparator(&a.cell(column), &b.cell(column));
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        self.indicator = SortIndicator {
            column: Some(column),
            direction,
        };
        debug!(%column, %direction, undo = self.history.undo_count(), "sorted rows");
    }

    /// Sorts with the column's default comparator.
    pub fn sort_by_column(&mut self, column: Column, direction: SortDirection) {
        self.sort_by(column, direction, default_comparator(column));
    }

    /// Restores the previous checkpoint. Returns false when there was none.
    pub fn undo(&mut self) -> bool {
        let available = self.history.undo_count() > 0;
        let current = self.take_snapshot();
        let previous = self.history.undo(current);
        self.restore(previous);
        available
    }

    /// Re-applies an undone checkpoint. Returns false when there was none.
    pub fn redo(&mut self) -> bool {
        let available = self.history.redo_count() > 0;
        let current = self.take_snapshot();
        let next = self.history.redo(current);
        self.restore(next);
        available
    }

    /// Original entry index for each current row position.
    pub fn current_permutation(&self) -> Vec<usize> {
        self.rows.iter().map(DisplayRow::source_index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(priority: usize, category: &str, label: &str) -> DisplayRow {
        DisplayRow {
            priority,
            category: category.to_string(),
            condition: "-".to_string(),
            label: label.to_string(),
            process: "-".to_string(),
        }
    }

    fn session() -> OrderSession {
        OrderSession::new(vec![
            row(1, "filter", "Work"),
            row(2, "filter", "Bills"),
            row(3, "filter", "Work"),
            row(4, "filter", "Alerts"),
        ])
    }

    #[test]
    fn test_swap_exchanges_rows() {
        let mut s = session();
        assert!(s.swap(0, 2).unwrap());
        assert_eq!(s.current_permutation(), vec![2, 1, 0, 3]);
        assert_eq!(s.rows()[0], row(3, "filter", "Work"));
        assert_eq!(s.undo_count(), 1);
    }

    #[test]
    fn test_swap_twice_restores_order() {
        let mut s = session();
        s.swap(1, 3).unwrap();
        s.swap(1, 3).unwrap();
        assert_eq!(s.current_permutation(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_swap_same_row_records_nothing() {
        let mut s = session();
        assert!(!s.swap(2, 2).unwrap());
        assert_eq!(s.undo_count(), 0);
    }

    #[test]
    fn test_swap_out_of_range_is_rejected() {
        let mut s = session();
        assert_eq!(
            s.swap(0, 4),
            Err(ValidationError::RowOutOfRange { row: 4, rows: 4 })
        );
        assert_eq!(s.undo_count(), 0);
        assert_eq!(s.current_permutation(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut s = session();
        s.sort_by_column(Column::Label, SortDirection::Ascending);
        assert_eq!(s.current_permutation(), vec![3, 1, 0, 2]);

        let mut s = session();
        s.sort_by_column(Column::Label, SortDirection::Descending);
        // the two "Work" rows keep their pre-sort order
        assert_eq!(s.current_permutation(), vec![0, 2, 1, 3]);
        assert_eq!(
            s.indicator(),
            SortIndicator {
                column: Some(Column::Label),
                direction: SortDirection::Descending
            }
        );
    }

    #[test]
    fn test_priority_sorts_numerically() {
        let rows = (1..=12).rev().map(|p| row(p, "filter", "-")).collect();
        let mut s = OrderSession::new(rows);
        s.sort_by_column(Column::Priority, SortDirection::Ascending);
        assert_eq!(s.current_permutation(), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_custom_comparator() {
        let mut s = session();
        s.sort_by(Column::Label, SortDirection::Ascending, |a, b| {
            a.len().cmp(&b.len())
        });
        // Work(4) Work(4) Bills(5) Alerts(6)
        assert_eq!(s.current_permutation(), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_n_undos_return_to_start() {
        let mut s = session();
        let start = s.rows().to_vec();

        s.swap(0, 1).unwrap();
        s.sort_by_column(Column::Label, SortDirection::Ascending);
        s.swap(2, 3).unwrap();

        assert!(s.undo());
        assert!(s.undo());
        assert!(s.undo());
        assert!(!s.undo());
        assert_eq!(s.rows(), start.as_slice());
        assert_eq!(s.indicator(), SortIndicator::default());
    }

    #[test]
    fn test_undo_restores_indicator_and_redo_reapplies() {
        let mut s = session();
        s.sort_by_column(Column::Label, SortDirection::Ascending);
        let sorted = s.current_permutation();

        s.undo();
        assert_eq!(s.indicator().column, None);
        assert_eq!(s.redo_count(), 1);

        assert!(s.redo());
        assert_eq!(s.current_permutation(), sorted);
        assert_eq!(s.indicator().column, Some(Column::Label));
    }

    #[test]
    fn test_new_action_discards_redo() {
        let mut s = session();
        s.swap(0, 1).unwrap();
        s.undo();
        assert_eq!(s.redo_count(), 1);

        s.swap(2, 3).unwrap();
        assert_eq!(s.redo_count(), 0);
        assert!(!s.redo());
        assert_eq!(s.current_permutation(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_history_depth_limit() {
        let mut s = OrderSession::with_max_depth(session().rows().to_vec(), Some(1));
        s.swap(0, 1).unwrap();
        s.swap(0, 1).unwrap();
        assert_eq!(s.undo_count(), 1);
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Descending));
        assert!("up".parse::<SortDirection>().is_err());
    }
}
