//! Line-oriented command dispatcher.
//!
//! Each input line is split on whitespace and parsed with clap; the first
//! word selects the command. Unknown commands are reported and skipped.
//! Malformed lines and operational failures of read-only commands are
//! reported and skipped; for commands that mutate the store either one
//! stops the run.

use crate::client::{sorted, Store};
use crate::lifecycle::{self, LifecycleError};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{info, warn};

/// One parsed input line.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print every series matching a selector
    #[command(name = "find")]
    Find {
        cell: String,
        #[arg(allow_hyphen_values = true)]
        selector: String,
        read_token: String,
    },

    /// Print the series matching a selector that hold datapoints
    #[command(name = "fetch")]
    Fetch {
        cell: String,
        #[arg(allow_hyphen_values = true)]
        selector: String,
        read_token: String,
    },

    /// Delete datapoints at or before an instant (microseconds or RFC 3339)
    #[command(name = "delete_older")]
    DeleteOlder {
        cell: String,
        #[arg(allow_hyphen_values = true)]
        selector: String,
        write_token: String,
        #[arg(value_parser = parse_instant, allow_hyphen_values = true)]
        instant: i64,
    },

    /// Delete matching series entirely
    #[command(name = "delete_all")]
    DeleteAll {
        cell: String,
        #[arg(allow_hyphen_values = true)]
        selector: String,
        write_token: String,
    },

    /// Tag series with metadata but no datapoints as wdlcm=empty
    #[command(name = "mark_empty")]
    MarkEmpty {
        cell: String,
        #[arg(allow_hyphen_values = true)]
        selector: String,
        read_token: String,
        write_token: String,
    },

    /// Delete series tagged wdlcm=empty once none of them holds data
    #[command(name = "delete_empty")]
    DeleteEmpty {
        cell: String,
        read_token: String,
        write_token: String,
    },
}

/// Wrapper parsing one input line as a subcommand.
#[derive(Parser, Debug)]
#[command(name = "wdlcm", no_binary_name = true, disable_help_subcommand = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("invalid command: {0}")]
    Unknown(String),

    /// Known command with missing, extra or invalid arguments
    #[error("{message}")]
    Usage { command: String, message: String },
}

impl CommandError {
    /// Whether this rejected line stops the run.
    pub fn halts(&self) -> bool {
        matches!(self, Self::Usage { command, .. } if !is_read_only(command))
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Cannot read commands or write output: {0}")]
    Io(#[from] std::io::Error),

    /// A mutating command failed; remaining input was not processed
    #[error("{command} failed, remaining commands skipped")]
    Halted {
        command: &'static str,
        #[source]
        source: LifecycleError,
    },

    /// A mutating command line was malformed; remaining input was not processed
    #[error("malformed {command} line, remaining commands skipped")]
    Malformed {
        command: String,
        #[source]
        source: CommandError,
    },
}

/// Counters for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Commands that completed successfully
    pub executed: usize,
    /// Read-only commands that failed and were skipped
    pub failed: usize,
    /// Lines rejected as unknown or malformed
    pub rejected: usize,
}

fn is_read_only(name: &str) -> bool {
    matches!(name, "find" | "fetch")
}

/// Parse an instant given as microseconds since epoch or as an RFC 3339 timestamp.
pub fn parse_instant(value: &str) -> Result<i64, String> {
    if let Ok(micros) = value.parse::<i64>() {
        return Ok(micros);
    }
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_micros())
        .map_err(|_| "expected microseconds since epoch or RFC 3339".to_string())
}

/// Keep clap's error and usage lines, drop the `--help` hint.
fn usage_message(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .filter(|line| !line.starts_with("For more information"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

impl Command {
    /// Parse a line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(&name) = words.first() else {
            return Ok(None);
        };

        match Line::try_parse_from(words.iter().copied()) {
            Ok(parsed) => Ok(Some(parsed.command)),
            Err(err)
                if err.kind() == ErrorKind::InvalidSubcommand
                    || Line::command().find_subcommand(name).is_none() =>
            {
                Err(CommandError::Unknown(name.to_string()))
            }
            Err(err) => Err(CommandError::Usage {
                command: name.to_string(),
                message: usage_message(&err),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Find { .. } => "find",
            Self::Fetch { .. } => "fetch",
            Self::DeleteOlder { .. } => "delete_older",
            Self::DeleteAll { .. } => "delete_all",
            Self::MarkEmpty { .. } => "mark_empty",
            Self::DeleteEmpty { .. } => "delete_empty",
        }
    }

    /// Whether a failure of this command stops the run.
    ///
    /// Commands that mutate the store halt; read-only commands do not.
    pub fn halts_on_failure(&self) -> bool {
        !is_read_only(self.name())
    }
}

/// Result of a successful command, ready to print.
enum Output {
    Series(Vec<String>),
    Text(String),
    Marked { cell: String, count: usize },
}

fn execute<S: Store>(store: &S, command: &Command) -> Result<Output, LifecycleError> {
    let output = match command {
        Command::Find {
            cell,
            selector,
            read_token,
        } => Output::Series(sorted(store.find(cell, selector, read_token)?)),
        Command::Fetch {
            cell,
            selector,
            read_token,
        } => Output::Series(sorted(store.fetch(cell, selector, read_token)?)),
        Command::DeleteOlder {
            cell,
            selector,
            write_token,
            instant,
        } => Output::Text(store.delete_older(cell, selector, write_token, *instant)?),
        Command::DeleteAll {
            cell,
            selector,
            write_token,
        } => Output::Text(store.delete_all(cell, selector, write_token)?),
        Command::MarkEmpty {
            cell,
            selector,
            read_token,
            write_token,
        } => Output::Marked {
            cell: cell.clone(),
            count: lifecycle::mark_empty(store, cell, selector, read_token, write_token)?,
        },
        Command::DeleteEmpty {
            cell,
            read_token,
            write_token,
        } => Output::Text(lifecycle::delete_empty(
            store,
            cell,
            read_token,
            write_token,
        )?),
    };
    Ok(output)
}

fn print_output<W: Write>(out: &mut W, output: Output) -> std::io::Result<()> {
    match output {
        Output::Series(series) => {
            for s in series {
                writeln!(out, "{}", s)?;
            }
        }
        Output::Text(text) => {
            let text = text.trim_end();
            if !text.is_empty() {
                writeln!(out, "{}", text)?;
            }
        }
        Output::Marked { cell, count } => {
            writeln!(out, "marked {} series as empty in cell {}", count, cell)?;
        }
    }
    Ok(())
}

fn print_failure<W: Write>(out: &mut W, err: &LifecycleError) -> std::io::Result<()> {
    match err {
        LifecycleError::StillPopulated { series } => {
            writeln!(
                out,
                "{} failed to delete series marked as empty as the following still contain datapoints:",
                "error:".red().bold()
            )?;
            for s in series {
                writeln!(out, "  {}", s)?;
            }
        }
        LifecycleError::Store(e) => {
            writeln!(out, "{} {}", "error:".red().bold(), e)?;
        }
    }
    Ok(())
}

/// Run every command read from `input` against `store`, writing results to `out`.
pub fn run<S, R, W>(store: &S, input: R, out: &mut W) -> Result<Summary, DispatchError>
where
    S: Store,
    R: BufRead,
    W: Write,
{
    let mut summary = Summary::default();

    for line in input.lines() {
        let line = line?;
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(out, "{}", err)?;
                if err.halts() {
                    let command = match &err {
                        CommandError::Usage { command, .. } => command.clone(),
                        CommandError::Unknown(name) => name.clone(),
                    };
                    return Err(DispatchError::Malformed {
                        command,
                        source: err,
                    });
                }
                warn!("Rejected line: {}", err);
                summary.rejected += 1;
                continue;
            }
        };

        match execute(store, &command) {
            Ok(output) => {
                print_output(out, output)?;
                summary.executed += 1;
            }
            Err(err) => {
                print_failure(out, &err)?;
                if command.halts_on_failure() {
                    return Err(DispatchError::Halted {
                        command: command.name(),
                        source: err,
                    });
                }
                warn!("{} failed, continuing: {}", command.name(), err);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Processed {} commands ({} failed, {} rejected)",
        summary.executed + summary.failed,
        summary.failed,
        summary.rejected
    );
    Ok(summary)
}
