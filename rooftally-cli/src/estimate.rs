//! `estimate` command: size a region before caching it.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rooftally_core::Bbox;
use rooftally_data::CacheEstimate;
use serde::{Deserialize, Serialize};

use crate::settings::{DEFAULT_CACHE_DIR, open_store, parse_bbox, write_json};
use crate::{ARG_BBOX, ARG_CACHE_DIR, CliError, ENV_ESTIMATE_BBOX};

/// CLI arguments for the `estimate` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "estimate",
    about = "Estimate the download size of a region and list overlapping cached areas"
)]
#[ortho_config(prefix = "ROOFTALLY")]
pub(crate) struct EstimateArgs {
    /// Region as `minlon,minlat,maxlon,maxlat`.
    #[arg(long = ARG_BBOX, value_name = "bbox", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// Directory holding cached areas.
    #[arg(long = ARG_CACHE_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
}

/// Resolved `estimate` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EstimateConfig {
    pub(crate) bbox: Bbox,
    pub(crate) cache_dir: Utf8PathBuf,
}

impl TryFrom<EstimateArgs> for EstimateConfig {
    type Error = CliError;

    fn try_from(args: EstimateArgs) -> Result<Self, Self::Error> {
        let raw = args.bbox.ok_or(CliError::MissingArgument {
            field: ARG_BBOX,
            env: ENV_ESTIMATE_BBOX,
        })?;
        Ok(Self {
            bbox: parse_bbox(&raw)?,
            cache_dir: args
                .cache_dir
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_DIR)),
        })
    }
}

pub(crate) fn run_estimate(args: EstimateArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = EstimateConfig::try_from(merged)?;
    let store = open_store(&config.cache_dir)?;
    write_json(out, &CacheEstimate::for_store(&store, &config.bbox))
}
