//! Load, edit and export workflow.
//!
//! `Shell` holds the loaded document and its ordering session and drives them
//! only through their public operations. Front ends register observers and
//! refresh themselves from the `ShellEvent` sent after every state change.

use crate::adjuster;
use crate::config::AppConfig;
use crate::error::{FilterError, Result};
use crate::filter_document::{Column, DisplayRow, FilterDocument};
use crate::order_session::{OrderSession, SortDirection, SortIndicator};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// State change reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Loaded { path: PathBuf, entries: usize },
    Swapped { i: usize, j: usize },
    Sorted { column: Column, direction: SortDirection },
    Undone,
    Redone,
    Exported { path: PathBuf },
}

type Observer = Box<dyn FnMut(&ShellEvent)>;

/// A loaded document together with its editing session.
#[derive(Debug)]
struct Workspace {
    path: PathBuf,
    document: FilterDocument,
    session: OrderSession,
}

/// Undo/redo depth, for enabling controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStatus {
    pub undo: usize,
    pub redo: usize,
}

impl HistoryStatus {
    pub fn can_undo(&self) -> bool {
        self.undo > 0
    }

    pub fn can_redo(&self) -> bool {
        self.redo > 0
    }
}

/// Drives the core for a front end.
pub struct Shell {
    config: AppConfig,
    workspace: Option<Workspace>,
    observers: Vec<Observer>,
}

impl Shell {
    /// Creates a shell with no document loaded.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::Config` if `config` fails validation.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            workspace: None,
            observers: Vec::new(),
        })
    }

    /// Registers a callback invoked after every state change.
    pub fn subscribe(&mut self, observer: impl FnMut(&ShellEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self, event: ShellEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }

    fn workspace(&self) -> Result<&Workspace> {
        self.workspace.as_ref().ok_or(FilterError::NoDocument)
    }

    fn workspace_mut(&mut self) -> Result<&mut Workspace> {
        self.workspace.as_mut().ok_or(FilterError::NoDocument)
    }

    /// Loads and parses a filter file, replacing the current document.
    ///
    /// On any failure the previously loaded document and session are kept.
    /// Returns the number of entries loaded.
    ///
    /// # Arguments
    ///
    /// * `path` - The exported filter file to read
    ///
    /// # Errors
    ///
    /// Returns `FilterError::FileNotFound` if `path` does not exist,
    /// `FilterError::Read` if it cannot be read and `FilterError::Parse` if it
    /// is not a valid filter feed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filtersort::{AppConfig, Shell};
    /// use std::path::Path;
    ///
    /// let mut shell = Shell::new(AppConfig::default())?;
    /// let entries = shell.load(Path::new("mailFilters.xml"))?;
    /// println!("{} filters", entries);
    /// # Ok::<(), filtersort::FilterError>(())
    /// ```
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            warn!(path = %path.display(), "filter file not found");
            return Err(FilterError::FileNotFound(path.to_path_buf()));
        }

        let source = fs::read_to_string(path).map_err(|e| FilterError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let document = FilterDocument::parse(&source)?;
        let entries = document.len();

        let session = OrderSession::with_max_depth(
            document.to_display_rows(),
            self.config.history.max_depth,
        );
        self.workspace = Some(Workspace {
            path: path.to_path_buf(),
            document,
            session,
        });

        info!(path = %path.display(), entries, "loaded filter document");
        self.notify(ShellEvent::Loaded {
            path: path.to_path_buf(),
            entries,
        });
        Ok(entries)
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.workspace.as_ref().map(|w| w.path.as_path())
    }

    /// The document as loaded, in its original order.
    pub fn document(&self) -> Result<&FilterDocument> {
        Ok(&self.workspace()?.document)
    }

    /// Rows in their current order.
    pub fn rows(&self) -> Result<&[DisplayRow]> {
        Ok(self.workspace()?.session.rows())
    }

    pub fn sort_indicator(&self) -> Result<SortIndicator> {
        Ok(self.workspace()?.session.indicator())
    }

    pub fn history_status(&self) -> HistoryStatus {
        match &self.workspace {
            Some(w) => HistoryStatus {
                undo: w.session.undo_count(),
                redo: w.session.redo_count(),
            },
            None => HistoryStatus { undo: 0, redo: 0 },
        }
    }

    /// Exchanges two rows (0-based). Returns whether the order changed.
    ///
    /// # Arguments
    ///
    /// * `i` - Position of the first row
    /// * `j` - Position of the second row
    ///
    /// # Errors
    ///
    /// Returns `FilterError::NoDocument` when nothing is loaded and
    /// `FilterError::Validation` when either position is out of range.
    pub fn swap(&mut self, i: usize, j: usize) -> Result<bool> {
        let changed = self.workspace_mut()?.session.swap(i, j)?;
        if changed {
            self.notify(ShellEvent::Swapped { i, j });
        }
        Ok(changed)
    }

    /// Sorts rows by a column with its default comparator.
    ///
    /// # Arguments
    ///
    /// * `column` - Column whose cell text is compared
    /// * `direction` - Ascending or descending; ties keep their order either way
    pub fn sort(&mut self, column: Column, direction: SortDirection) -> Result<()> {
        self.workspace_mut()?
            .session
            .sort_by_column(column, direction);
        self.notify(ShellEvent::Sorted { column, direction });
        Ok(())
    }

    /// Returns whether anything was undone.
    pub fn undo(&mut self) -> Result<bool> {
        let undone = self.workspace_mut()?.session.undo();
        if undone {
            self.notify(ShellEvent::Undone);
        }
        Ok(undone)
    }

    /// Returns whether anything was redone.
    pub fn redo(&mut self) -> Result<bool> {
        let redone = self.workspace_mut()?.session.redo();
        if redone {
            self.notify(ShellEvent::Redone);
        }
        Ok(redone)
    }

    /// Renders the current order as importer-ready text.
    pub fn render_export(&self) -> Result<String> {
        let workspace = self.workspace()?;
        let permutation = workspace.session.current_permutation();
        let reordered = workspace.document.reorder(&permutation)?;
        let serialized = reordered.serialize_with_indent(&self.config.export.indent);
        Ok(adjuster::adjust(serialized).into_string())
    }

    /// Writes the current order next to the source file, stamped with the
    /// current local time. Returns the path written.
    ///
    /// The loaded document is not modified, so exporting again after more
    /// edits starts from the same entries.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::NoDocument` when nothing is loaded and
    /// `FilterError::Write` if the file cannot be written.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filtersort::{AppConfig, Shell};
    /// use std::path::Path;
    ///
    /// let mut shell = Shell::new(AppConfig::default())?;
    /// shell.load(Path::new("mailFilters.xml"))?;
    /// shell.swap(0, 2)?;
    /// let written = shell.export()?;
    /// println!("wrote {}", written.display());
    /// # Ok::<(), filtersort::FilterError>(())
    /// ```
    pub fn export(&mut self) -> Result<PathBuf> {
        self.export_at(Local::now())
    }

    /// Same as `export`, with an explicit timestamp.
    pub fn export_at(&mut self, timestamp: DateTime<Local>) -> Result<PathBuf> {
        let text = self.render_export()?;
        let source = &self.workspace()?.path;
        let path = export_path(
            source,
            &self.config.export.marker,
            &self.config.export.timestamp_format,
            timestamp,
        );

        fs::write(&path, text).map_err(|e| FilterError::Write {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "exported filter document");
        self.notify(ShellEvent::Exported { path: path.clone() });
        Ok(path)
    }
}

/// Derives `<stem>(<marker>_<timestamp>)<.ext>` next to `source`.
///
/// # Arguments
///
/// * `source` - Path of the loaded filter file
/// * `marker` - Literal placed before the timestamp
/// * `timestamp_format` - chrono format string for `timestamp`
/// * `timestamp` - Export time
///
/// # Example
///
/// ```
/// use chrono::{Local, TimeZone};
/// use filtersort::shell::export_path;
/// use std::path::{Path, PathBuf};
///
/// let at = Local.with_ymd_and_hms(2024, 10, 19, 14, 25, 30).unwrap();
/// let path = export_path(Path::new("mailFilters.xml"), "tooledit", "%Y%m%d-%H%M%S", at);
/// assert_eq!(path, PathBuf::from("mailFilters(tooledit_20241019-142530).xml"));
/// ```
pub fn export_path(
    source: &Path,
    marker: &str,
    timestamp_format: &str,
    timestamp: DateTime<Local>,
) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let file_name = format!(
        "{}({}_{}){}",
        stem,
        marker,
        timestamp.format(timestamp_format),
        extension
    );

    match source.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Lists the `*.xml` files directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns `FilterError::FileNotFound` if `dir` is not a directory.
pub fn list_filter_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FilterError::FileNotFound(dir.to_path_buf()));
    }

    let pattern = format!("{}/*.xml", glob::Pattern::escape(&dir.to_string_lossy()));
    let paths = glob::glob(&pattern).map_err(|e| FilterError::Read {
        path: dir.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
    })?;

    let mut files: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .collect();
    files.sort();

    debug!(dir = %dir.display(), count = files.len(), "listed filter files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_export_path_format() {
        let timestamp = Local.with_ymd_and_hms(2024, 10, 19, 14, 25, 30).unwrap();
        let path = export_path(
            Path::new("/data/mailFilters.xml"),
            "tooledit",
            "%Y%m%d-%H%M%S",
            timestamp,
        );

        assert_eq!(
            path,
            PathBuf::from("/data/mailFilters(tooledit_20241019-142530).xml")
        );
    }

    #[test]
    fn test_export_path_without_extension() {
        let timestamp = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let path = export_path(Path::new("filters"), "sorted", "%Y%m%d-%H%M%S", timestamp);

        assert_eq!(path, PathBuf::from("filters(sorted_20240102-030405)"));
    }

    #[test]
    fn test_operations_without_document() {
        let mut shell = Shell::new(AppConfig::default()).unwrap();

        assert!(matches!(shell.swap(0, 1), Err(FilterError::NoDocument)));
        assert!(matches!(shell.undo(), Err(FilterError::NoDocument)));
        assert!(matches!(shell.export(), Err(FilterError::NoDocument)));
        assert_eq!(shell.history_status(), HistoryStatus { undo: 0, redo: 0 });
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.export.marker.clear();
        assert!(matches!(Shell::new(config), Err(FilterError::Config(_))));
    }
}
