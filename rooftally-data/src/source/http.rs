//! HTTP-based [`FootprintSource`] over a tiled GeoJSON endpoint.
//!
//! The remote dataset is queried one tile at a time with
//! `GET {base_url}/footprints?bbox=minlon,minlat,maxlon,maxlat`. Each tile
//! becomes one [`FootprintBatch`], so callers see progress as tiles arrive.
//!
//! # Architecture
//!
//! [`FootprintSource`] is synchronous. Tile requests are async, so each one
//! blocks on a Tokio runtime: the ambient one when it is multi-threaded,
//! otherwise a `current_thread` runtime the source owns.
//!
//! # Example
//!
//! ```no_run
//! use rooftally_core::{Bbox, FootprintSource};
//! use rooftally_data::source::{HttpFootprintSource, HttpFootprintSourceConfig};
//!
//! let source = HttpFootprintSource::new(HttpFootprintSourceConfig::new("http://localhost:8080"))?;
//! let bbox = Bbox::new(-95.82, 36.05, -95.81, 36.07)?;
//! let footprints = source.fetch_all(&bbox)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Duration;
use std::vec;

use log::debug;
use reqwest::{Client, Url};
use rooftally_core::{Bbox, FootprintBatch, FootprintBatches, FootprintSource, SourceError};
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::geojson::parse_feature_collection;
use super::partition::partition_bbox;

/// Largest tile edge, in degrees, requested in one call by default.
pub const DEFAULT_TILE_DEGREES: f64 = 0.05;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("rooftally/", env!("CARGO_PKG_VERSION"));
const TILE_PATH: &str = "footprints";

/// Why an [`HttpFootprintSource`] could not be built.
#[derive(Debug, Error)]
pub enum SourceBuildError {
    /// The base URL does not name an HTTP(S) service.
    #[error("footprint service URL {url:?} is unusable: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// Tiles must have a positive, finite edge.
    #[error("tile edge must be a positive number of degrees, got {degrees}")]
    InvalidTileEdge { degrees: f64 },
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The fallback runtime could not be built.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Where tiles are fetched from and how large each one may be.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFootprintSourceConfig {
    /// Base URL of the footprint service, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Connect and whole-request timeout for each tile.
    pub timeout: Duration,
    /// Largest tile edge, in degrees, on either axis.
    pub tile_degrees: f64,
}

impl Default for HttpFootprintSourceConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

impl HttpFootprintSourceConfig {
    /// Tiles from `base_url` with the default timeout and tile edge.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            tile_degrees: DEFAULT_TILE_DEGREES,
        }
    }
}

/// The `footprints` resource under a validated base URL.
#[derive(Debug, Clone)]
struct TileEndpoint(Url);

impl TileEndpoint {
    fn parse(base_url: &str) -> Result<Self, SourceBuildError> {
        let invalid = |reason: String| SourceBuildError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason,
        };
        let trimmed = base_url.trim().trim_end_matches('/');
        let url = Url::parse(&format!("{trimmed}/{TILE_PATH}"))
            .map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        Ok(Self(url))
    }

    /// Request URL for `tile`. Commas stay literal.
    fn url_for(&self, tile: &Bbox) -> String {
        format!(
            "{}?bbox={},{},{},{}",
            self.0,
            tile.min_lon(),
            tile.min_lat(),
            tile.max_lon(),
            tile.max_lat()
        )
    }
}

/// HTTP footprint source that fetches one tile per request.
///
/// Inside a multi-threaded Tokio runtime (including its blocking pool) tiles
/// are fetched on that runtime with [`tokio::task::block_in_place`].
/// Anywhere else they block on the source's own `current_thread` runtime.
#[derive(Debug)]
pub struct HttpFootprintSource {
    client: Client,
    endpoint: TileEndpoint,
    tile_degrees: f64,
    fallback: Runtime,
}

impl HttpFootprintSource {
    /// Validate `config` and prepare the client.
    ///
    /// # Errors
    ///
    /// [`SourceBuildError::InvalidBaseUrl`] or
    /// [`SourceBuildError::InvalidTileEdge`] for unusable settings, and the
    /// remaining variants when the client or runtime fails to build.
    pub fn new(config: HttpFootprintSourceConfig) -> Result<Self, SourceBuildError> {
        let endpoint = TileEndpoint::parse(&config.base_url)?;
        if !config.tile_degrees.is_finite() || config.tile_degrees <= 0.0 {
            return Err(SourceBuildError::InvalidTileEdge {
                degrees: config.tile_degrees,
            });
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(SourceBuildError::HttpClient)?;
        let fallback = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SourceBuildError::Runtime)?;
        Ok(Self {
            client,
            endpoint,
            tile_degrees: config.tile_degrees,
            fallback,
        })
    }

    async fn fetch_tile_async(&self, tile: Bbox) -> Result<FootprintBatch, SourceError> {
        let url = self.endpoint.url_for(&tile);
        debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(SourceError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| convert_reqwest_error(&err))?;
        parse_feature_collection(&body)
    }

    fn fetch_tile(&self, tile: Bbox) -> Result<FootprintBatch, SourceError> {
        let future = self.fetch_tile_async(tile);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.fallback.block_on(future),
        }
    }
}

/// Remaining tiles of one `fetch_by_bbox` call, fetched as they are pulled.
struct TileFetches<'a> {
    source: &'a HttpFootprintSource,
    tiles: vec::IntoIter<Bbox>,
}

impl Iterator for TileFetches<'_> {
    type Item = Result<FootprintBatch, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let tile = self.tiles.next()?;
        Some(self.source.fetch_tile(tile))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tiles.size_hint()
    }
}

fn convert_reqwest_error(error: &reqwest::Error) -> SourceError {
    if error.is_timeout() {
        return SourceError::Timeout;
    }
    if let Some(status) = error.status() {
        return SourceError::Http {
            status: status.as_u16(),
            message: error.to_string(),
        };
    }
    if error.is_decode() || error.is_body() {
        return SourceError::Parse {
            message: error.to_string(),
        };
    }
    SourceError::Network {
        message: error.to_string(),
    }
}

impl FootprintSource for HttpFootprintSource {
    /// One batch per tile, fetched lazily.
    ///
    /// On a `current_thread` runtime's own thread the fallback runtime blocks
    /// the caller's runtime; run the fetch on a blocking thread instead.
    fn fetch_by_bbox(&self, bbox: &Bbox) -> Result<FootprintBatches<'_>, SourceError> {
        let tiles = partition_bbox(bbox, self.tile_degrees);
        debug!("fetching {bbox} as {} tiles", tiles.len());
        Ok(Box::new(TileFetches {
            source: self,
            tiles: tiles.into_iter(),
        }))
    }
}
