//! ragloop binary entry point.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ragloop::cli::{Cli, execute};

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_directive = if verbose { "warn,ragloop=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .context("invalid log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .context("failed to install tracing subscriber")
}

fn run() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let output = execute(&cli)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
