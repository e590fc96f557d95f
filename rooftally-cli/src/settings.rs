//! Store and source settings shared by every subcommand.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use rooftally_core::Bbox;
use rooftally_data::source::{HttpFootprintSource, HttpFootprintSourceConfig};
use rooftally_data::{AreaCacheService, AreaStore, ServiceConfig};
use serde::Serialize;

use crate::CliError;

/// Cache directory used when none is configured.
pub(crate) const DEFAULT_CACHE_DIR: &str = "building_cache";

/// Where cached areas live and how to reach the remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) cache_dir: Utf8PathBuf,
    pub(crate) source_url: String,
    pub(crate) timeout: Duration,
}

impl Settings {
    /// Fill unset options with defaults.
    pub(crate) fn from_options(
        cache_dir: Option<Utf8PathBuf>,
        source_url: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        let defaults = HttpFootprintSourceConfig::default();
        Self {
            cache_dir: cache_dir.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_DIR)),
            source_url: source_url.unwrap_or(defaults.base_url),
            timeout: timeout_secs.map_or(defaults.timeout, Duration::from_secs),
        }
    }

    pub(crate) fn open_store(&self) -> Result<Arc<AreaStore>, CliError> {
        open_store(&self.cache_dir)
    }

    /// Build the service over the configured store and HTTP source.
    ///
    /// The source owns a Tokio runtime, so the service must be dropped
    /// outside any async context.
    pub(crate) fn build_service(&self) -> Result<AreaCacheService, CliError> {
        let store = self.open_store()?;
        let config = HttpFootprintSourceConfig {
            timeout: self.timeout,
            ..HttpFootprintSourceConfig::new(self.source_url.clone())
        };
        let source = HttpFootprintSource::new(config).map_err(|source| CliError::BuildSource {
            base_url: self.source_url.clone(),
            source,
        })?;
        Ok(AreaCacheService::new(
            store,
            Arc::new(source),
            ServiceConfig::default(),
        ))
    }
}

pub(crate) fn open_store(cache_dir: &Utf8Path) -> Result<Arc<AreaStore>, CliError> {
    AreaStore::open(cache_dir)
        .map(Arc::new)
        .map_err(|source| CliError::OpenStore {
            path: cache_dir.to_path_buf(),
            source,
        })
}

/// Parse `minlon,minlat,maxlon,maxlat`.
pub(crate) fn parse_bbox(value: &str) -> Result<Bbox, CliError> {
    let numbers = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| CliError::InvalidBbox {
            value: value.to_owned(),
            reason: err.to_string(),
        })?;
    Bbox::from_slice(&numbers).map_err(|source| CliError::RejectedBbox {
        value: value.to_owned(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}
