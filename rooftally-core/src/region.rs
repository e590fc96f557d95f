//! Region sizing: circle bounding boxes and download estimates.
//!
//! The estimates here are heuristics used to size and gate cache requests.
//! They are not authoritative counts.

use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::area::bytes_to_mb;
use crate::bbox::{Bbox, BboxError, validate_coord};

/// Mean Earth radius used by the spherical bounding-box formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Kilometres per degree of latitude.
pub const KM_PER_DEGREE: f64 = 111.32;
/// Assumed structures per square kilometre.
pub const DEFAULT_DENSITY_PER_KM2: f64 = 200.0;
/// Assumed bytes per stored footprint.
pub const AVG_BYTES_PER_ENTITY: u64 = 160;
/// Largest region accepted for durable caching.
pub const MAX_CACHE_AREA_KM2: f64 = 10_000.0;

/// Errors raised while sizing or validating a region.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegionError {
    /// The radius was not a positive, finite number of metres.
    #[error("radius must be a positive number of metres, got {radius_m}")]
    InvalidRadius {
        /// Supplied radius.
        radius_m: f64,
    },
    /// The centre or box coordinates were invalid.
    #[error(transparent)]
    Bbox(#[from] BboxError),
    /// The region exceeds the cache size limit.
    #[error("area too large ({area_km2:.0} km²); maximum is {limit_km2:.0} km²")]
    TooLarge {
        /// Estimated area of the rejected region.
        area_km2: f64,
        /// Configured limit.
        limit_km2: f64,
    },
}

/// Heuristic size of a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeEstimate {
    /// Area rounded to two decimals.
    pub area_km2: f64,
    /// Expected number of footprints.
    pub estimated_entities: u64,
    /// Expected size of the data file.
    pub estimated_bytes: u64,
}

impl SizeEstimate {
    /// Expected size in mebibytes, rounded to two decimals.
    #[must_use]
    pub fn estimated_size_mb(&self) -> f64 {
        round_to(bytes_to_mb(self.estimated_bytes), 2)
    }
}

/// Bounding box of the circle of `radius_m` metres around `center`.
///
/// Uses the spherical angular-distance formula, so the box always contains
/// the true circle. Latitudes are clamped to the poles. A circle that reaches
/// a pole or crosses the antimeridian spans every longitude, since a [`Bbox`]
/// cannot wrap.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use rooftally_core::region::bounding_box;
///
/// # fn main() -> Result<(), rooftally_core::RegionError> {
/// let bbox = bounding_box(Coord { x: -95.8, y: 36.1 }, 1_000.0)?;
/// assert!(bbox.min_lat() < 36.1 && bbox.max_lat() > 36.1);
/// # Ok(())
/// # }
/// ```
pub fn bounding_box(center: Coord<f64>, radius_m: f64) -> Result<Bbox, RegionError> {
    validate_coord(center)?;
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(RegionError::InvalidRadius { radius_m });
    }

    let angular = radius_m / EARTH_RADIUS_M;
    let lat = center.y.to_radians();
    let min_lat = (lat - angular).to_degrees().max(-90.0);
    let max_lat = (lat + angular).to_degrees().min(90.0);

    let ratio = angular.sin() / lat.cos();
    let reaches_pole = min_lat <= -90.0 || max_lat >= 90.0;
    let (min_lon, max_lon) = if reaches_pole || !ratio.is_finite() || ratio >= 1.0 {
        (-180.0, 180.0)
    } else {
        let delta = ratio.asin().to_degrees();
        let (west, east) = (center.x - delta, center.x + delta);
        if west < -180.0 || east > 180.0 {
            (-180.0, 180.0)
        } else {
            (west, east)
        }
    };

    Ok(Bbox::new(min_lon, min_lat, max_lon, max_lat)?)
}

/// Estimate the area, footprint count and storage cost of `bbox`.
#[must_use]
pub fn estimate_size(bbox: &Bbox) -> SizeEstimate {
    let center_lat = bbox.center().y;
    let lat_km = bbox.height_deg() * KM_PER_DEGREE;
    let lon_km = bbox.width_deg() * KM_PER_DEGREE * center_lat.to_radians().cos();
    let area_km2 = (lat_km * lon_km).abs();

    let estimated_entities = (area_km2 * DEFAULT_DENSITY_PER_KM2).floor() as u64;
    SizeEstimate {
        area_km2: round_to(area_km2, 2),
        estimated_entities,
        estimated_bytes: estimated_entities * AVG_BYTES_PER_ENTITY,
    }
}

/// Reject regions larger than [`MAX_CACHE_AREA_KM2`].
pub fn validate_cache_region(bbox: &Bbox) -> Result<SizeEstimate, RegionError> {
    let estimate = estimate_size(bbox);
    if estimate.area_km2 > MAX_CACHE_AREA_KM2 {
        return Err(RegionError::TooLarge {
            area_km2: estimate.area_km2,
            limit_km2: MAX_CACHE_AREA_KM2,
        });
    }
    Ok(estimate)
}

/// Round `value` to `decimals` decimal places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}
