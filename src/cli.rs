//! Command-line interface module for filtersort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Showing and listing filter files
//! - The line-oriented edit session (swap, sort, undo, redo, export)

use crate::config::AppConfig;
use crate::error::{FilterError, Result};
use crate::filter_document::Column;
use crate::order_session::SortDirection;
use crate::output::OutputFormatter;
use crate::shell::{self, Shell};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Reorder exported mail filter rules and export them for re-import.
#[derive(Debug, Parser)]
#[command(name = "filtersort", version, about)]
pub struct Cli {
    /// Configuration file (defaults to .filtersortrc.toml or ~/.config/filtersort/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the rules of a filter file as a table
    Show {
        file: PathBuf,
        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the filter files in a directory
    List { dir: PathBuf },
    /// Reorder rules interactively, or from a script of edit commands
    Edit {
        file: PathBuf,
        /// Read edit commands from this file instead of stdin
        #[arg(long)]
        script: Option<PathBuf>,
    },
}

/// One command of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    Show,
    /// Rows are 1-based, as displayed.
    Swap(usize, usize),
    Sort(Column, SortDirection),
    Undo,
    Redo,
    Status,
    Export,
    Help,
    Quit,
}

const EDIT_HELP: &str = "commands:
  show                 print the table
  swap I J             exchange rows I and J (1-based)
  sort COLUMN [asc|desc]
                       sort by priority, category, condition, label or process
  undo / redo          step through history
  status               show undo/redo depth
  export               write the current order next to the source file
  quit                 leave the session";

impl std::str::FromStr for EditCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let row = |s: &str| -> std::result::Result<usize, String> {
            match s.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(n),
                _ => Err(format!("'{}' is not a row number (rows start at 1)", s)),
            }
        };

        match (verb.as_str(), args.as_slice()) {
            ("show", []) => Ok(EditCommand::Show),
            ("swap", [i, j]) => Ok(EditCommand::Swap(row(*i)?, row(*j)?)),
            ("sort", [column]) => Ok(EditCommand::Sort(column.parse()?, SortDirection::Ascending)),
            ("sort", [column, direction]) => {
                Ok(EditCommand::Sort(column.parse()?, direction.parse()?))
            }
            ("undo", []) => Ok(EditCommand::Undo),
            ("redo", []) => Ok(EditCommand::Redo),
            ("status", []) => Ok(EditCommand::Status),
            ("export", []) => Ok(EditCommand::Export),
            ("help" | "?", []) => Ok(EditCommand::Help),
            ("quit" | "exit", []) => Ok(EditCommand::Quit),
            ("", _) => Err("empty command".to_string()),
            (other, _) => Err(format!(
                "unrecognized command '{}' (type 'help' for usage)",
                other
            )),
        }
    }
}

/// Runs the parsed command line.
pub fn run_cli(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Show { file, json } => show_file(config, &file, json),
        Command::List { dir } => list_dir(&dir),
        Command::Edit { file, script } => match script {
            Some(script) => {
                let reader = BufReader::new(File::open(&script).map_err(|e| {
                    FilterError::Read {
                        path: script.clone(),
                        source: e,
                    }
                })?);
                edit_file(config, &file, reader, false)
            }
            None => edit_file(config, &file, io::stdin().lock(), true),
        },
    }
}

fn show_file(config: AppConfig, file: &Path, json: bool) -> Result<()> {
    let mut shell = Shell::new(config)?;
    shell.load(file)?;

    if json {
        let rows = shell.rows()?;
        let text = serde_json::to_string_pretty(rows)?;
        OutputFormatter::plain(&text);
    } else {
        OutputFormatter::info(&format!("Filters in: {}", file.display()));
        OutputFormatter::rows_table(shell.rows()?, shell.sort_indicator()?);
    }
    Ok(())
}

fn list_dir(dir: &Path) -> Result<()> {
    let files = shell::list_filter_files(dir)?;
    if files.is_empty() {
        OutputFormatter::warning(&format!("No XML files found in {}", dir.display()));
        return Ok(());
    }

    OutputFormatter::header(&format!("Filter files in {}", dir.display()));
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        OutputFormatter::plain(&format!(" - {}", name));
    }
    Ok(())
}

/// Loads `file` and runs edit commands read from `input`.
///
/// Command errors are reported and the session continues; only a failure to
/// load the file or to read input ends it early.
pub fn edit_file<R: BufRead>(
    config: AppConfig,
    file: &Path,
    input: R,
    interactive: bool,
) -> Result<()> {
    let mut shell = Shell::new(config)?;
    let entries = shell.load(file)?;
    OutputFormatter::info(&format!(
        "Loaded {} filters from {}",
        entries,
        file.display()
    ));
    if interactive {
        OutputFormatter::plain(EDIT_HELP);
    }

    run_session(&mut shell, input, interactive)
}

/// Reads commands line by line and applies them to `shell`.
pub fn run_session<R: BufRead>(shell: &mut Shell, input: R, interactive: bool) -> Result<()> {
    let mut lines = input.lines();

    loop {
        if interactive {
            print!("> ");
            io::stdout().flush().ok();
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|e| FilterError::Read {
            path: PathBuf::from("<input>"),
            source: e,
        })?;

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let command = match trimmed.parse::<EditCommand>() {
            Ok(command) => command,
            Err(message) => {
                OutputFormatter::error(&message);
                continue;
            }
        };

        if command == EditCommand::Quit {
            break;
        }
        if let Err(e) = apply_command(shell, command) {
            OutputFormatter::error(&e.to_string());
        }
    }

    Ok(())
}

fn apply_command(shell: &mut Shell, command: EditCommand) -> Result<()> {
    match command {
        EditCommand::Show => {
            OutputFormatter::rows_table(shell.rows()?, shell.sort_indicator()?);
        }
        EditCommand::Swap(i, j) => {
            if shell.swap(i - 1, j - 1)? {
                OutputFormatter::success(&format!("Swapped rows {} and {}", i, j));
            } else {
                OutputFormatter::plain("Nothing to swap");
            }
        }
        EditCommand::Sort(column, direction) => {
            shell.sort(column, direction)?;
            OutputFormatter::success(&format!("Sorted by {} ({})", column, direction));
        }
        EditCommand::Undo => {
            if !shell.undo()? {
                OutputFormatter::warning("Nothing to undo");
            }
            OutputFormatter::history_status(shell.history_status());
        }
        EditCommand::Redo => {
            if !shell.redo()? {
                OutputFormatter::warning("Nothing to redo");
            }
            OutputFormatter::history_status(shell.history_status());
        }
        EditCommand::Status => OutputFormatter::history_status(shell.history_status()),
        EditCommand::Export => {
            let path = shell.export()?;
            OutputFormatter::success(&format!("Exported to {}", path.display()));
        }
        EditCommand::Help => OutputFormatter::plain(EDIT_HELP),
        EditCommand::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_commands() {
        assert_eq!("swap 1 3".parse::<EditCommand>(), Ok(EditCommand::Swap(1, 3)));
        assert_eq!(
            "sort label desc".parse::<EditCommand>(),
            Ok(EditCommand::Sort(Column::Label, SortDirection::Descending))
        );
        assert_eq!(
            "SORT priority".parse::<EditCommand>(),
            Ok(EditCommand::Sort(Column::Priority, SortDirection::Ascending))
        );
        assert_eq!("  undo ".parse::<EditCommand>(), Ok(EditCommand::Undo));
        assert_eq!("exit".parse::<EditCommand>(), Ok(EditCommand::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_commands() {
        assert!("swap 0 2".parse::<EditCommand>().is_err());
        assert!("swap 1".parse::<EditCommand>().is_err());
        assert!("sort size".parse::<EditCommand>().is_err());
        assert!("sort label sideways".parse::<EditCommand>().is_err());
        assert!("delete 1".parse::<EditCommand>().is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "filtersort",
            "--verbose",
            "edit",
            "f.xml",
            "--script",
            "s.txt",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Edit { file, script } => {
                assert_eq!(file, PathBuf::from("f.xml"));
                assert_eq!(script, Some(PathBuf::from("s.txt")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
