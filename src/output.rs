//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status
//! messages, the filter table and the undo/redo status line.

use crate::filter_document::{Column, DisplayRow};
use crate::order_session::{SortDirection, SortIndicator};
use crate::shell::HistoryStatus;
use colored::*;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - The filter table and the undo/redo status line
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filtersort::output::OutputFormatter;
    /// OutputFormatter::success("Exported to mailFilters(tooledit_20241019-142530).xml");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark, on stderr.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filtersort::output::OutputFormatter;
    /// OutputFormatter::error("row 7 does not exist (table has 3 rows)");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filtersort::output::OutputFormatter;
    /// OutputFormatter::warning("Nothing to undo");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    ///
    /// # Arguments
    ///
    /// * `header` - The header text
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints the filter rows as a table, header in bold.
    ///
    /// # Arguments
    ///
    /// * `rows` - Rows in their current order
    /// * `indicator` - Sort state; the sorted column header gets an arrow
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filtersort::output::OutputFormatter;
    /// use filtersort::order_session::SortIndicator;
    ///
    /// OutputFormatter::rows_table(&[], SortIndicator::default());
    /// ```
    pub fn rows_table(rows: &[DisplayRow], indicator: SortIndicator) {
        let mut lines = render_table(rows, indicator).into_iter();
        if let Some(header) = lines.next() {
            println!("{}", header.bold());
        }
        for line in lines {
            println!("{}", line);
        }
    }

    /// Prints how many steps can be undone and redone.
    ///
    /// Counts that are zero are dimmed.
    ///
    /// # Arguments
    ///
    /// * `status` - Current undo/redo depth
    pub fn history_status(status: HistoryStatus) {
        let undo = if status.can_undo() {
            status.undo.to_string().green()
        } else {
            status.undo.to_string().dimmed()
        };
        let redo = if status.can_redo() {
            status.redo.to_string().green()
        } else {
            status.redo.to_string().dimmed()
        };
        println!("undo: {}  redo: {}", undo, redo);
    }
}

/// Lays out rows as plain text: header, separator, then one line per row.
///
/// The sorted column carries `▲` or `▼` in the header.
pub fn render_table(rows: &[DisplayRow], indicator: SortIndicator) -> Vec<String> {
    let headers: Vec<String> = Column::ALL
        .iter()
        .map(|&column| match indicator.column {
            Some(sorted) if sorted == column => {
                let arrow = match indicator.direction {
                    SortDirection::Ascending => "▲",
                    SortDirection::Descending => "▼",
                };
                format!("{} {}", column.header(), arrow)
            }
            _ => column.header().to_string(),
        })
        .collect();

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| Column::ALL.iter().map(|&c| row.cell(c)).collect())
        .collect();

    let widths: Vec<usize> = (0..Column::ALL.len())
        .map(|idx| {
            cells
                .iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(headers[idx].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| pad(value, width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_line(&headers));
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(format_line(row));
    }
    lines
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{}{}", value, " ".repeat(width.saturating_sub(len)))
}
