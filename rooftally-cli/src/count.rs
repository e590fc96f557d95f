//! `count` command: buildings within a radius of a point.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use geo::Coord;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rooftally_core::FootprintSummary;
use rooftally_data::{BuildingCount, ResolvedFrom};
use serde::{Deserialize, Serialize};

use crate::settings::{Settings, build_runtime, write_json};
use crate::{
    ARG_CACHE_DIR, ARG_LAT, ARG_LON, ARG_RADIUS_KM, ARG_SOURCE_URL, ARG_TIMEOUT_SECS, CliError,
    ENV_COUNT_LAT, ENV_COUNT_LON,
};

/// Radius used when none is configured.
pub(crate) const DEFAULT_RADIUS_KM: f64 = 1.0;

/// CLI arguments for the `count` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "count",
    about = "Count buildings within a radius of a point",
    long_about = "Count building footprints intersecting a circle. Answers come \
                 from recent queries, a cached area covering the circle, or \
                 the remote footprint service, in that order."
)]
#[ortho_config(prefix = "ROOFTALLY")]
pub(crate) struct CountArgs {
    /// Latitude of the centre point.
    #[arg(long = ARG_LAT, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Longitude of the centre point.
    #[arg(long = ARG_LON, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// Search radius in kilometres (at most 10).
    #[arg(long = ARG_RADIUS_KM, value_name = "km")]
    #[serde(default)]
    pub(crate) radius_km: Option<f64>,
    /// Directory holding cached areas.
    #[arg(long = ARG_CACHE_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
    /// Base URL of the footprint service.
    #[arg(long = ARG_SOURCE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) source_url: Option<String>,
    /// Request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl CountArgs {
    fn into_config(self) -> Result<CountConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        CountConfig::try_from(merged)
    }
}

/// Resolved `count` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CountConfig {
    pub(crate) center: Coord<f64>,
    pub(crate) radius_km: f64,
    pub(crate) settings: Settings,
}

impl TryFrom<CountArgs> for CountConfig {
    type Error = CliError;

    fn try_from(args: CountArgs) -> Result<Self, Self::Error> {
        let lat = args.lat.ok_or(CliError::MissingArgument {
            field: ARG_LAT,
            env: ENV_COUNT_LAT,
        })?;
        let lon = args.lon.ok_or(CliError::MissingArgument {
            field: ARG_LON,
            env: ENV_COUNT_LON,
        })?;
        Ok(Self {
            center: Coord { x: lon, y: lat },
            radius_km: args.radius_km.unwrap_or(DEFAULT_RADIUS_KM),
            settings: Settings::from_options(args.cache_dir, args.source_url, args.timeout_secs),
        })
    }
}

/// JSON printed by `count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CountReport {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) radius_km: f64,
    pub(crate) radius_meters: f64,
    #[serde(flatten)]
    pub(crate) summary: FootprintSummary,
    pub(crate) resolved_from: ResolvedFrom,
    pub(crate) message: String,
}

impl CountReport {
    pub(crate) fn new(config: &CountConfig, count: BuildingCount) -> Self {
        Self {
            latitude: config.center.y,
            longitude: config.center.x,
            radius_km: config.radius_km,
            radius_meters: count.radius_m,
            message: format!(
                "Found {} buildings within {}km",
                count.summary.count, config.radius_km
            ),
            summary: count.summary,
            resolved_from: count.resolved_from,
        }
    }
}

pub(crate) fn run_count(args: CountArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let service = config.settings.build_service()?;
    let runtime = build_runtime()?;
    let count = runtime.block_on(service.count(config.center, config.radius_km))?;
    drop(runtime);
    write_json(out, &CountReport::new(&config, count))
}
