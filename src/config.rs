//! Export and history configuration.
//!
//! Settings are read from a TOML file. Every key is optional; missing keys
//! fall back to the defaults shown below.
//!
//! # Configuration File Format
//!
//! ```toml
//! [export]
//! marker = "tooledit"
//! timestamp_format = "%Y%m%d-%H%M%S"
//! indent = "\t"
//!
//! [history]
//! max_depth = 200
//! ```

use crate::error::ConfigError;
use chrono::Local;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCAL_CONFIG: &str = ".filtersortrc.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub export: ExportSettings,

    #[serde(default)]
    pub history: HistorySettings,
}

/// How exported files are named and laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Literal placed before the timestamp in the export file name.
    #[serde(default = "default_marker")]
    pub marker: String,

    /// chrono format string for the export timestamp.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Indentation unit written per nesting depth.
    #[serde(default = "default_indent")]
    pub indent: String,
}

fn default_marker() -> String {
    "tooledit".to_string()
}

fn default_timestamp_format() -> String {
    "%Y%m%d-%H%M%S".to_string()
}

fn default_indent() -> String {
    "\t".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            timestamp_format: default_timestamp_format(),
            indent: default_indent(),
        }
    }
}

/// Undo history limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Maximum number of undo checkpoints; unbounded when absent.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl AppConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.filtersortrc.toml` in the current directory
    /// 3. Look for `~/.config/filtersort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot
    /// be read, or if any loaded file fails validation.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("filtersort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if file does not exist.
    /// Returns `ConfigError::Invalid` if TOML parsing fails.
    /// Returns `ConfigError::Io` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let export = &self.export;

        if export.marker.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "export.marker",
                reason: "must not be empty".to_string(),
            });
        }
        if export.marker.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                key: "export.marker",
                reason: "must not contain path separators".to_string(),
            });
        }
        if !export.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(ConfigError::InvalidValue {
                key: "export.indent",
                reason: "may only contain spaces and tabs".to_string(),
            });
        }
        if export.timestamp_format.is_empty()
            || StrftimeItems::new(&export.timestamp_format).any(|item| matches!(item, Item::Error))
        {
            return Err(ConfigError::InvalidValue {
                key: "export.timestamp_format",
                reason: format!("'{}' is not a valid format", export.timestamp_format),
            });
        }
        let mut rendered = String::new();
        if write!(rendered, "{}", Local::now().format(&export.timestamp_format)).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "export.timestamp_format",
                reason: format!("'{}' cannot be rendered", export.timestamp_format),
            });
        }
        if rendered.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                key: "export.timestamp_format",
                reason: format!(
                    "'{}' renders path separators into the file name",
                    export.timestamp_format
                ),
            });
        }
        if self.history.max_depth == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "history.max_depth",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}
