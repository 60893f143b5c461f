//! Command-line interface for the geostitch pipeline.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod fetch;
mod kinds;
mod logging;
mod output;

pub use error::CliError;

use fetch::{FetchArgs, run_fetch};
use kinds::run_kinds;

const ARG_AREA: &str = "area";
const ARG_KINDS: &str = "kinds";
const ARG_OUTPUT: &str = "output";
const ARG_TIMEOUT_SECS: &str = "timeout-secs";
const ARG_MAX_ATTEMPTS: &str = "max-attempts";
const ARG_OVERPASS_RPS: &str = "overpass-rps";
const ARG_WFS_BASE_URL: &str = "wfs-base-url";
const ARG_OVERPASS_URL: &str = "overpass-url";
const ARG_LOG_LEVEL: &str = "log-level";
const ENV_AREA: &str = "GEOSTITCH_CMDS_FETCH_AREA";

/// Run the geostitch CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Fetch(args) => run_fetch(args),
        Command::Kinds => {
            let mut stdout = std::io::stdout().lock();
            run_kinds(&mut stdout)
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "geostitch",
    about = "Fetch and harmonize Berlin open geodata for one area",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Acquire the requested datasets and write the harmonized result.
    Fetch(FetchArgs),
    /// List the supported dataset kinds with their metadata.
    Kinds,
}

#[cfg(test)]
mod tests;
