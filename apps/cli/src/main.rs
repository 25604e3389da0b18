//! ThunderDrive command-line client.

mod app;
mod browse;
mod cli;
mod config;
mod output;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 50;

fn main() -> ExitCode {
    // Argument errors exit with status 2 from here.
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if !cli.has_mode() {
        if let Err(e) = Cli::command().print_help() {
            tracing::error!("cannot print help: {e}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = rt.block_on(async {
        tokio::select! {
            result = app::run(cli) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    match outcome {
        Some(Ok(())) => ExitCode::SUCCESS,
        Some(Err(e)) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
        None => {
            tracing::warn!("interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}
