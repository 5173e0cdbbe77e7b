//! filtersort - reorder exported mail filter rules
//!
//! This library loads an exported filter feed (Atom XML with the apps schema
//! extension), lets the rules be reordered by row swaps and column sorts with
//! undo/redo, and writes the result back in the form the mail importer accepts.

pub mod adjuster;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed_xml;
pub mod filter_document;
pub mod order_session;
pub mod output;
pub mod shell;

pub use adjuster::{AdjustedXml, adjust};
pub use checkpoint::CheckpointStack;
pub use config::AppConfig;
pub use error::{ConfigError, FilterError, ParseError, Result, ValidationError};
pub use feed_xml::SerializedXml;
pub use filter_document::{Column, DisplayRow, FilterDocument, FilterEntry, FilterProperty};
pub use order_session::{OrderSession, SortDirection, SortIndicator};
pub use shell::{HistoryStatus, Shell, ShellEvent};

pub use cli::{Cli, run_cli};
