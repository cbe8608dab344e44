//! CLI definitions and command dispatch for wdlcm.

pub mod dispatch;

use clap::Parser;
use dispatch::{DispatchError, Summary};
use std::path::PathBuf;

/// wdlcm - Warp 10 Data Life Cycle Manager
///
/// Reads commands from standard input, one per line:
///
///   find         <cell> <selector> <read_token>
///   fetch        <cell> <selector> <read_token>
///   delete_older <cell> <selector> <write_token> <instant>
///   delete_all   <cell> <selector> <write_token>
///   mark_empty   <cell> <selector> <read_token> <write_token>
///   delete_empty <cell> <read_token> <write_token>
#[derive(Parser, Debug)]
#[command(name = "wdlcm")]
#[command(author, version, about, long_about, verbatim_doc_comment)]
pub struct Cli {
    /// Path to the configuration file (default: ~/.config/wdlcm/wdlcm.toml if present)
    #[arg(short = 'c', long = "configuration", alias = "config")]
    pub configuration: Option<PathBuf>,

    /// Read commands from this file instead of standard input
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Per-request timeout in seconds (default: wait indefinitely)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Process exit status for a run: 0 when every line was handled, 1 otherwise.
pub fn exit_status(result: &Result<Summary, DispatchError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Only color output going to a terminal; piped output stays plain text.
pub fn init_color(stdout_is_terminal: bool) {
    colored::control::set_override(stdout_is_terminal);
}
