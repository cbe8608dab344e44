//! wdlcm - Warp 10 Data Life Cycle Manager
//!
//! Reads lifecycle commands from standard input and runs them against the
//! configured Warp 10 cells.
//!
//! Usage:
//!   echo "mark_empty prod ~app.* READ WRITE" | wdlcm -c wdlcm.toml
//!   echo "delete_empty prod READ WRITE"      | wdlcm -c wdlcm.toml

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use warp10_dlcm::cli::{exit_status, init_color, Cli};
use warp10_dlcm::{run, Config, DispatchError, Warp10Client};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_color(io::stdout().is_terminal());

    // Initialize logging (stderr, so stdout only carries command output)
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warp10_dlcm={},wdlcm={}", log_level, log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = match &cli.configuration {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    tracing::debug!(
        "Configured cells: {:?}",
        config.cell_names().collect::<Vec<_>>()
    );

    let client = Warp10Client::new(&config, cli.timeout.map(Duration::from_secs))
        .context("Cannot build HTTP client")?;

    let input: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path)
                .with_context(|| format!("Cannot open input file: {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = run(&client, input, &mut out);
    match &result {
        Ok(_) => {}
        Err(DispatchError::Halted { command, source }) => {
            tracing::error!("{} failed, remaining commands skipped: {}", command, source);
            eprintln!("{}", format!("✗ Stopped after {} failure", command).red());
        }
        Err(DispatchError::Malformed { command, source }) => {
            tracing::error!("Malformed {} line, remaining commands skipped: {}", command, source);
            eprintln!("{}", format!("✗ Stopped after malformed {} line", command).red());
        }
        Err(err) => tracing::error!("{}", err),
    }

    Ok(ExitCode::from(exit_status(&result)))
}
