//! Filter rule set data model.
//!
//! A `FilterDocument` is the ordered list of rules from an exported mail filter
//! feed. Contents are opaque pass-through: this module only ever moves whole
//! entries around and projects them into display rows.

use crate::error::{ParseError, ValidationError};
use crate::feed_xml::{self, SerializedXml};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Default indentation unit used when serializing.
pub const DEFAULT_INDENT: &str = "\t";

/// Property names shown in the condition column.
const CONDITION_PROPERTIES: [&str; 2] = ["from", "subject"];
/// Property shown in the label column.
const LABEL_PROPERTY: &str = "label";
/// Qualifiers of `size` that are never displayed on their own.
const HIDDEN_PROPERTIES: [&str; 2] = ["sizeOperator", "sizeUnit"];
/// Placeholder for an empty display cell.
const EMPTY_CELL: &str = "-";

/// A single condition or action key-value pair on an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterProperty {
    pub name: String,
    pub value: String,
}

impl FilterProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One filter rule.
///
/// `id`, `updated` and `title` are carried verbatim; they are never regenerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub category: String,
    pub title: String,
    pub id: String,
    pub updated: String,
    pub properties: Vec<FilterProperty>,
}

impl FilterEntry {
    /// Returns the value of the first property with the given name.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    fn display_cells(&self) -> (String, String, String) {
        let mut conditions = Vec::new();
        let mut label = EMPTY_CELL.to_string();
        let mut others = Vec::new();

        for property in &self.properties {
            let name = property.name.as_str();
            if CONDITION_PROPERTIES.contains(&name) {
                conditions.push(format!("{}:({})", property.name, property.value));
            } else if name == LABEL_PROPERTY {
                label = property.value.clone();
            } else if !HIDDEN_PROPERTIES.contains(&name) {
                others.push(format!("{}:{{{}}}", property.name, property.value));
            }
        }

        (join_or_dash(&conditions), label, join_or_dash(&others))
    }
}

fn join_or_dash(parts: &[String]) -> String {
    if parts.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        parts.join(", ")
    }
}

/// Author block of the feed header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Feed-level metadata that precedes the entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedHeader {
    pub title: Option<String>,
    pub id: Option<String>,
    pub updated: Option<String>,
    pub author: Option<FeedAuthor>,
}

/// Columns of the display projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Priority,
    Category,
    Condition,
    Label,
    Process,
}

impl Column {
    /// All columns in display order.
    pub const ALL: [Column; 5] = [
        Column::Priority,
        Column::Category,
        Column::Condition,
        Column::Label,
        Column::Process,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::Priority => "priority",
            Column::Category => "category",
            Column::Condition => "condition",
            Column::Label => "label",
            Column::Process => "process",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.header().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown column '{}': expected one of priority, category, condition, label, process",
                    s
                )
            })
    }
}

/// One row of the read-only display projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    /// 1-based position of the entry in the loaded document.
    pub priority: usize,
    pub category: String,
    pub condition: String,
    pub label: String,
    pub process: String,
}

impl DisplayRow {
    /// Returns the text shown in `column`.
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Priority => self.priority.to_string(),
            Column::Category => self.category.clone(),
            Column::Condition => self.condition.clone(),
            Column::Label => self.label.clone(),
            Column::Process => self.process.clone(),
        }
    }

    /// Index of the entry this row was projected from.
    pub fn source_index(&self) -> usize {
        self.priority - 1
    }
}

/// An ordered filter rule set.
///
/// The only mutation is a whole-entry reorder, which yields a new document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDocument {
    header: FeedHeader,
    entries: Vec<FilterEntry>,
}

impl FilterDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(header: FeedHeader, entries: Vec<FilterEntry>) -> Self {
        Self { header, entries }
    }

    /// Parses a filter feed.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` when the text is not well-formed XML or when an
    /// entry is missing `category`, `title`, `id` or `updated`.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        feed_xml::parse_feed(source)
    }

    /// Serializes with the default indentation unit.
    pub fn serialize(&self) -> SerializedXml {
        self.serialize_with_indent(DEFAULT_INDENT)
    }

    pub fn serialize_with_indent(&self, indent: &str) -> SerializedXml {
        feed_xml::write_feed(self, indent)
    }

    pub fn header(&self) -> &FeedHeader {
        &self.header
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a new document whose entry at position `k` is the current entry
    /// at `permutation[k]`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `permutation` is not a bijection on
    /// `[0, len)`. `self` is never modified.
    pub fn reorder(&self, permutation: &[usize]) -> Result<Self, ValidationError> {
        validate_permutation(permutation, self.entries.len())?;

        let entries = permutation
            .iter()
            .map(|&idx| self.entries[idx].clone())
            .collect();

        Ok(Self {
            header: self.header.clone(),
            entries,
        })
    }

    /// Projects entries into `(priority, category, condition, label, process)` rows.
    pub fn to_display_rows(&self) -> Vec<DisplayRow> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let (condition, label, process) = entry.display_cells();
                DisplayRow {
                    priority: idx + 1,
                    category: entry.category.clone(),
                    condition,
                    label,
                    process,
                }
            })
            .collect()
    }
}

/// Checks that `permutation` maps `[0, len)` onto itself exactly once.
pub fn validate_permutation(permutation: &[usize], len: usize) -> Result<(), ValidationError> {
    if permutation.len() != len {
        return Err(ValidationError::LengthMismatch {
            expected: len,
            actual: permutation.len(),
        });
    }

    let mut seen = vec![false; len];
    for &index in permutation {
        if index >= len {
            return Err(ValidationError::IndexOutOfRange { index, len });
        }
        if std::mem::replace(&mut seen[index], true) {
            return Err(ValidationError::DuplicateIndex { index });
        }
    }

    Ok(())
}
