//! Records describing materialised regions.

use std::fmt;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::Bbox;

/// Opaque identifier of a cached area.
///
/// Fresh identifiers are the first eight hex characters of a v4 UUID; any
/// string read back from an index is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(String);

impl AreaId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut hex = uuid::Uuid::new_v4().simple().to_string();
        hex.truncate(8);
        Self(hex)
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AreaId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for AreaId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named region whose footprints have been written to the area store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedArea {
    /// Identifier, also the stem of the data file name.
    pub id: AreaId,
    /// Human-readable label supplied by the caller.
    pub name: String,
    /// Region that was downloaded.
    pub bbox: Bbox,
    /// Longitude of the point the caller centred the region on.
    pub center_lon: f64,
    /// Latitude of the point the caller centred the region on.
    pub center_lat: f64,
    /// Informational radius in kilometres.
    #[serde(default)]
    pub radius_km: Option<f64>,
    /// Estimated surface area, rounded to two decimals.
    pub area_km2: f64,
    /// Number of footprints in the data file.
    #[serde(alias = "building_count")]
    pub entity_count: usize,
    /// Size of the data file on disk.
    pub file_size_bytes: u64,
    /// Data file location relative to the store root.
    pub file_path: Utf8PathBuf,
    /// When the area was registered.
    pub created_at: DateTime<Utc>,
    /// When the area was last loaded.
    pub last_accessed: DateTime<Utc>,
}

impl CachedArea {
    /// The centre point as a coordinate.
    #[must_use]
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: self.center_lon,
            y: self.center_lat,
        }
    }

    /// Data file size in mebibytes.
    #[must_use]
    pub fn file_size_mb(&self) -> f64 {
        bytes_to_mb(self.file_size_bytes)
    }

    /// Short reference used when listing overlaps.
    #[must_use]
    pub fn to_ref(&self) -> AreaRef {
        AreaRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Convert a byte count to mebibytes for display.
#[must_use]
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Identifier and name of an area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRef {
    /// Area identifier.
    pub id: AreaId,
    /// Area name.
    pub name: String,
}

/// A request to materialise a region into the area store.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRequest {
    /// Region to download.
    pub bbox: Bbox,
    /// Label for the new area.
    pub name: String,
    /// Point the caller centred the region on.
    pub center: Coord<f64>,
    /// Informational radius in kilometres.
    pub radius_km: Option<f64>,
}

impl CacheRequest {
    /// Build a request centred on the middle of `bbox`.
    pub fn new(bbox: Bbox, name: impl Into<String>) -> Self {
        Self {
            bbox,
            name: name.into(),
            center: bbox.center(),
            radius_km: None,
        }
    }

    /// Override the centre point.
    #[must_use]
    pub const fn with_center(mut self, center: Coord<f64>) -> Self {
        self.center = center;
        self
    }

    /// Record the radius the region was derived from.
    #[must_use]
    pub const fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = Some(radius_km);
        self
    }
}
