//! `cache` command: download a region into the durable store.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use futures_util::StreamExt;
use geo::Coord;
use log::warn;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rooftally_core::{Bbox, CacheRequest, CachedArea};
use rooftally_data::{AreaCacheService, TaskProgress, TaskStatus};
use serde::{Deserialize, Serialize};

use crate::settings::{Settings, build_runtime, parse_bbox, write_json};
use crate::{
    ARG_BBOX, ARG_CACHE_DIR, ARG_LAT, ARG_LON, ARG_NAME, ARG_RADIUS_KM, ARG_SOURCE_URL,
    ARG_TIMEOUT_SECS, CliError, ENV_CACHE_BBOX, ENV_CACHE_NAME,
};

/// CLI arguments for the `cache` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "cache",
    about = "Download every footprint in a region into the cache",
    long_about = "Download every footprint in a region into the cache. Progress \
                 is written to stderr; the new area is printed as JSON once \
                 the download completes."
)]
#[ortho_config(prefix = "ROOFTALLY")]
pub(crate) struct CacheArgs {
    /// Region as `minlon,minlat,maxlon,maxlat`.
    #[arg(long = ARG_BBOX, value_name = "bbox", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// Label stored with the area.
    #[arg(long = ARG_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Latitude recorded as the area centre. Defaults to the bbox centre.
    #[arg(long = ARG_LAT, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Longitude recorded as the area centre. Defaults to the bbox centre.
    #[arg(long = ARG_LON, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// Radius the region was derived from, kept for reference.
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

/// Resolved `cache` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CacheConfig {
    pub(crate) request: CacheRequest,
    pub(crate) settings: Settings,
}

impl TryFrom<CacheArgs> for CacheConfig {
    type Error = CliError;

    fn try_from(args: CacheArgs) -> Result<Self, Self::Error> {
        let raw = args.bbox.ok_or(CliError::MissingArgument {
            field: ARG_BBOX,
            env: ENV_CACHE_BBOX,
        })?;
        let name = args.name.ok_or(CliError::MissingArgument {
            field: ARG_NAME,
            env: ENV_CACHE_NAME,
        })?;
        let bbox: Bbox = parse_bbox(&raw)?;
        let mut request = CacheRequest::new(bbox, name);
        if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
            request = request.with_center(Coord { x: lon, y: lat });
        }
        if let Some(radius_km) = args.radius_km {
            request = request.with_radius_km(radius_km);
        }
        Ok(Self {
            request,
            settings: Settings::from_options(args.cache_dir, args.source_url, args.timeout_secs),
        })
    }
}

pub(crate) fn run_cache(
    args: CacheArgs,
    out: &mut dyn Write,
    progress: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = CacheConfig::try_from(merged)?;
    let service = config.settings.build_service()?;
    let runtime = build_runtime()?;
    let outcome = runtime.block_on(follow_caching(&service, config.request, progress));
    drop(runtime);
    match outcome? {
        Some(area) => write_json(out, &area),
        None => write_json(out, &serde_json::Value::Null),
    }
}

/// Start a caching task and relay its progress until it finishes.
///
/// Returns the new area, or `None` when the region held no footprints.
pub(crate) async fn follow_caching(
    service: &AreaCacheService,
    request: CacheRequest,
    progress: &mut dyn Write,
) -> Result<Option<CachedArea>, CliError> {
    let task = service.start_caching(request)?;
    let Some(mut updates) = service.progress_stream(&task) else {
        return Err(CliError::CachingTimedOut {
            task: task.to_string(),
        });
    };
    while let Some(update) = updates.next().await {
        report_progress(progress, &update);
        match update.status {
            TaskStatus::Complete => return Ok(update.area),
            TaskStatus::Error => {
                return Err(CliError::CachingFailed {
                    message: update.error.unwrap_or(update.message),
                });
            }
            TaskStatus::Queued | TaskStatus::Running => {}
        }
    }
    Err(CliError::CachingTimedOut {
        task: task.to_string(),
    })
}

fn report_progress(progress: &mut dyn Write, update: &TaskProgress) {
    if let Err(err) = writeln!(progress, "[{:>3}%] {}", update.progress, update.message) {
        warn!("failed to write progress: {err}");
    }
}
