// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pscan_core::{Context, ScanOptions, Status};
use tracing_subscriber::EnvFilter;

/// Locate every occurrence of a literal byte pattern in a file.
#[derive(Parser, Debug)]
#[command(name = "pscan", version, about)]
struct Cli {
    /// File to scan.
    path: PathBuf,
    /// Literal byte pattern to search for.
    pattern: String,
    /// Maximum number of matches to report.
    #[arg(default_value_t = 100)]
    cap: i32,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("file not found: {path}")]
    OpenFailed { path: PathBuf },
    #[error("memory mapping failed for {path}")]
    MmapFailed { path: PathBuf },
    #[error("buffer allocation failed")]
    OutOfBounds,
    #[error("invalid argument: pattern must be non-empty and cap must be positive")]
    InvalidArg,
}

impl CliError {
    fn from_status(status: Status, path: &PathBuf) -> Self {
        match status {
            Status::Success => unreachable!("from_status only called on failure"),
            Status::OpenFailed | Status::NullArg => CliError::OpenFailed { path: path.clone() },
            Status::MmapFailed => CliError::MmapFailed { path: path.clone() },
            Status::OutOfBounds => CliError::OutOfBounds,
            Status::InvalidArg => CliError::InvalidArg,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(matches) => {
            for offset in matches {
                println!("{offset}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("pscan: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Vec<u64>, CliError> {
    if cli.pattern.is_empty() || cli.cap <= 0 {
        return Err(CliError::InvalidArg);
    }

    let mut ctx = Context::new(ScanOptions::default());

    let status = ctx.init(cli.pattern.as_bytes(), cli.cap as usize);
    if status != Status::Success {
        return Err(CliError::from_status(status, &cli.path));
    }

    let status = ctx.load(&cli.path);
    if status != Status::Success {
        return Err(CliError::from_status(status, &cli.path));
    }

    let status = ctx.execute();
    if status != Status::Success {
        return Err(CliError::from_status(status, &cli.path));
    }

    let matches = ctx.matches().to_vec();
    ctx.destroy();
    Ok(matches)
}
