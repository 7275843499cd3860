use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use openapi_synth::cli::CommandLineInterface;

const LOG_ENV: &str = "OPENAPI_SYNTH_LOG";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let command_line_interface = CommandLineInterface::load();
    init_tracing(command_line_interface.quiet, command_line_interface.verbose)?;
    command_line_interface.run().context("openapi-synth failed")
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
