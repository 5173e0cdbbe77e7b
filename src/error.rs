//! Error types for filter document handling.
//!
//! Parsing, permutation validation, configuration and file I/O each have their
//! own error enum; `FilterError` wraps them for callers that drive the whole
//! load → reorder → export flow.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading a filter feed.
///
/// Parsing is all-or-nothing, so any of these means no document was built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input is not well-formed XML, or its root is not an Atom feed.
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: usize, message: String },

    /// An entry lacks one of its required children.
    #[error("entry {entry} is missing required element <{element}>")]
    MissingElement { entry: usize, element: &'static str },

    /// A required attribute is absent on an entry child.
    #[error("entry {entry}: <{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        entry: usize,
        element: &'static str,
        attribute: &'static str,
    },
}

/// Errors produced when a reordering request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The permutation does not cover every entry exactly once.
    #[error("permutation has {actual} positions but the document has {expected} entries")]
    LengthMismatch { expected: usize, actual: usize },

    /// A permutation value points past the last entry.
    #[error("permutation index {index} is out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    /// A permutation value appears more than once.
    #[error("permutation index {index} appears more than once")]
    DuplicateIndex { index: usize },

    /// A row position passed to a swap does not exist.
    #[error("row {row} does not exist (table has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid TOML syntax or structure.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    Io(String),

    /// A key parsed but holds an unusable value.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Crate-wide error for the load, edit and export flow.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Rows could not be encoded for `show --json`.
    #[error("failed to encode rows as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An operation needs a loaded document and none is loaded.
    #[error("no filter document is loaded")]
    NoDocument,
}

/// Result type for filter operations.
pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_converts() {
        let source = serde_json::from_str::<u8>("not json").unwrap_err();
        let error = FilterError::from(source);

        assert!(matches!(error, FilterError::Json(_)));
        assert!(error.to_string().starts_with("failed to encode rows as JSON"));
    }

    #[test]
    fn test_read_error_names_path() {
        let error = FilterError::Read {
            path: PathBuf::from("/tmp/mailFilters.xml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(error.to_string(), "failed to read /tmp/mailFilters.xml: denied");
    }
}
