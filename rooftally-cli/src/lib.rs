//! Command-line interface for counting buildings and managing cached areas.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

mod areas;
mod cache;
mod count;
mod error;
mod estimate;
mod settings;

pub use error::CliError;

use areas::AreasCommand;
use cache::CacheArgs;
use count::CountArgs;
use estimate::EstimateArgs;

pub(crate) const ARG_LAT: &str = "lat";
pub(crate) const ARG_LON: &str = "lon";
pub(crate) const ARG_RADIUS_KM: &str = "radius-km";
pub(crate) const ARG_BBOX: &str = "bbox";
pub(crate) const ARG_NAME: &str = "name";
pub(crate) const ARG_AREA_ID: &str = "id";
pub(crate) const ARG_CACHE_DIR: &str = "cache-dir";
pub(crate) const ARG_SOURCE_URL: &str = "source-url";
pub(crate) const ARG_TIMEOUT_SECS: &str = "timeout-secs";

pub(crate) const ENV_COUNT_LAT: &str = "ROOFTALLY_CMDS_COUNT_LAT";
pub(crate) const ENV_COUNT_LON: &str = "ROOFTALLY_CMDS_COUNT_LON";
pub(crate) const ENV_ESTIMATE_BBOX: &str = "ROOFTALLY_CMDS_ESTIMATE_BBOX";
pub(crate) const ENV_CACHE_BBOX: &str = "ROOFTALLY_CMDS_CACHE_BBOX";
pub(crate) const ENV_CACHE_NAME: &str = "ROOFTALLY_CMDS_CACHE_NAME";
pub(crate) const ENV_DELETE_ID: &str = "ROOFTALLY_CMDS_DELETE_ID";

/// Run the rooftally CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();
    run_command(cli.command, &mut stdout, &mut stderr)
}

/// Dispatch one parsed command. Results go to `out`; caching progress goes
/// to `progress`.
fn run_command(
    command: Command,
    out: &mut dyn Write,
    progress: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Count(args) => count::run_count(args, out),
        Command::Estimate(args) => estimate::run_estimate(args, out),
        Command::Cache(args) => cache::run_cache(args, out, progress),
        Command::Areas(areas) => areas::run_areas(areas.command, out),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "rooftally",
    about = "Count building footprints and manage cached regions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Count buildings within a radius of a point.
    Count(CountArgs),
    /// Estimate the size of caching a region.
    Estimate(EstimateArgs),
    /// Download a region into the durable cache.
    Cache(CacheArgs),
    /// Inspect and manage cached areas.
    Areas(AreasArgs),
}

#[derive(Debug, clap::Args)]
struct AreasArgs {
    #[command(subcommand)]
    command: AreasCommand,
}

#[cfg(test)]
mod tests;
