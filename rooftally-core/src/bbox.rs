//! Axis-aligned longitude/latitude rectangles.
//!
//! [`Bbox`] keeps its edges ordered (`min <= max` on both axes) and inside the
//! WGS84 coordinate ranges. It serialises as the four-element list
//! `[min_lon, min_lat, max_lon, max_lat]` used by the area index.

use std::fmt;

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coordinate axis, used to report which edge pair is inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Longitude (x).
    Longitude,
    /// Latitude (y).
    Latitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Longitude => f.write_str("longitude"),
            Self::Latitude => f.write_str("latitude"),
        }
    }
}

/// Errors returned when a bounding box or coordinate is malformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BboxError {
    /// A coordinate was NaN or infinite.
    #[error("bounding box coordinates must be finite")]
    NonFinite,
    /// A latitude fell outside `[-90, 90]`.
    #[error("latitude {value} is outside [-90, 90]")]
    LatitudeOutOfRange {
        /// Offending latitude in degrees.
        value: f64,
    },
    /// A longitude fell outside `[-180, 180]`.
    #[error("longitude {value} is outside [-180, 180]")]
    LongitudeOutOfRange {
        /// Offending longitude in degrees.
        value: f64,
    },
    /// The minimum edge exceeded the maximum edge.
    #[error("minimum {axis} {min} exceeds maximum {max}")]
    Inverted {
        /// Axis whose edges are inverted.
        axis: Axis,
        /// Supplied minimum edge.
        min: f64,
        /// Supplied maximum edge.
        max: f64,
    },
    /// The loose list form did not contain exactly four values.
    #[error("bounding box needs 4 values (min_lon, min_lat, max_lon, max_lat), got {len}")]
    WrongArity {
        /// Number of values supplied.
        len: usize,
    },
}

/// Check that `coord` is a finite WGS84 position.
pub fn validate_coord(coord: Coord<f64>) -> Result<(), BboxError> {
    if !coord.x.is_finite() || !coord.y.is_finite() {
        return Err(BboxError::NonFinite);
    }
    if !(-90.0..=90.0).contains(&coord.y) {
        return Err(BboxError::LatitudeOutOfRange { value: coord.y });
    }
    if !(-180.0..=180.0).contains(&coord.x) {
        return Err(BboxError::LongitudeOutOfRange { value: coord.x });
    }
    Ok(())
}

/// Axis-aligned rectangle in (longitude, latitude) degrees.
///
/// # Examples
///
/// ```
/// use rooftally_core::Bbox;
///
/// # fn main() -> Result<(), rooftally_core::BboxError> {
/// let outer = Bbox::new(-96.0, 36.0, -95.0, 37.0)?;
/// let inner = Bbox::new(-95.9, 36.1, -95.1, 36.9)?;
/// assert!(outer.covers(&inner));
/// assert!(outer.overlaps(&inner));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bbox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl Bbox {
    /// Validate and construct a [`Bbox`].
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, BboxError> {
        validate_coord(Coord {
            x: min_lon,
            y: min_lat,
        })?;
        validate_coord(Coord {
            x: max_lon,
            y: max_lat,
        })?;
        if min_lon > max_lon {
            return Err(BboxError::Inverted {
                axis: Axis::Longitude,
                min: min_lon,
                max: max_lon,
            });
        }
        if min_lat > max_lat {
            return Err(BboxError::Inverted {
                axis: Axis::Latitude,
                min: min_lat,
                max: max_lat,
            });
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Build a [`Bbox`] from the loose `[min_lon, min_lat, max_lon, max_lat]`
    /// list form.
    pub fn from_slice(values: &[f64]) -> Result<Self, BboxError> {
        match values {
            [min_lon, min_lat, max_lon, max_lat] => {
                Self::new(*min_lon, *min_lat, *max_lon, *max_lat)
            }
            _ => Err(BboxError::WrongArity { len: values.len() }),
        }
    }

    /// Western edge.
    #[must_use]
    pub const fn min_lon(&self) -> f64 {
        self.min_lon
    }

    /// Southern edge.
    #[must_use]
    pub const fn min_lat(&self) -> f64 {
        self.min_lat
    }

    /// Eastern edge.
    #[must_use]
    pub const fn max_lon(&self) -> f64 {
        self.max_lon
    }

    /// Northern edge.
    #[must_use]
    pub const fn max_lat(&self) -> f64 {
        self.max_lat
    }

    /// Longitude span in degrees.
    #[must_use]
    pub fn width_deg(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Latitude span in degrees.
    #[must_use]
    pub fn height_deg(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Midpoint of the rectangle.
    #[must_use]
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: (self.min_lon + self.max_lon) / 2.0,
            y: (self.min_lat + self.max_lat) / 2.0,
        }
    }

    /// Whether `self` fully contains `other`. Shared edges count as contained.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        self.min_lon <= other.min_lon
            && self.min_lat <= other.min_lat
            && self.max_lon >= other.max_lon
            && self.max_lat >= other.max_lat
    }

    /// Whether the rectangles share any point, edges included.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.max_lon < other.min_lon
            || self.min_lon > other.max_lon
            || self.max_lat < other.min_lat
            || self.min_lat > other.max_lat)
    }

    /// The edges as `[min_lon, min_lat, max_lon, max_lat]`.
    #[must_use]
    pub const fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// The rectangle as a `geo` geometry (`x = longitude`, `y = latitude`).
    #[must_use]
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_lon,
                y: self.min_lat,
            },
            Coord {
                x: self.max_lon,
                y: self.max_lat,
            },
        )
    }
}

impl TryFrom<[f64; 4]> for Bbox {
    type Error = BboxError;

    fn try_from(values: [f64; 4]) -> Result<Self, Self::Error> {
        let [min_lon, min_lat, max_lon, max_lat] = values;
        Self::new(min_lon, min_lat, max_lon, max_lat)
    }
}

impl TryFrom<Rect<f64>> for Bbox {
    type Error = BboxError;

    fn try_from(rect: Rect<f64>) -> Result<Self, Self::Error> {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(bbox: Bbox) -> Self {
        bbox.to_array()
    }
}

impl From<Bbox> for Rect<f64> {
    fn from(bbox: Bbox) -> Self {
        bbox.to_rect()
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bbox(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Bbox {
        Bbox::new(min_lon, min_lat, max_lon, max_lat).expect("valid bbox")
    }

    #[rstest]
    fn rejects_inverted_longitude() {
        let err = Bbox::new(1.0, 0.0, 0.0, 1.0).expect_err("inverted bbox");
        assert!(matches!(
            err,
            BboxError::Inverted {
                axis: Axis::Longitude,
                ..
            }
        ));
    }

    #[rstest]
    fn rejects_inverted_latitude() {
        let err = Bbox::new(0.0, 1.0, 1.0, 0.0).expect_err("inverted bbox");
        assert!(matches!(
            err,
            BboxError::Inverted {
                axis: Axis::Latitude,
                ..
            }
        ));
    }

    #[rstest]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn rejects_non_finite(#[case] lon: f64, #[case] lat: f64) {
        assert_eq!(
            Bbox::new(lon, lat, 1.0, 1.0).expect_err("non-finite"),
            BboxError::NonFinite
        );
    }

    #[rstest]
    fn rejects_out_of_range_latitude() {
        let err = Bbox::new(0.0, -91.0, 1.0, 1.0).expect_err("out of range");
        assert!(matches!(err, BboxError::LatitudeOutOfRange { .. }));
    }

    #[rstest]
    #[case(&[1.0, 2.0, 3.0])]
    #[case(&[1.0, 2.0, 3.0, 4.0, 5.0])]
    fn from_slice_requires_four_values(#[case] values: &[f64]) {
        assert_eq!(
            Bbox::from_slice(values).expect_err("wrong arity"),
            BboxError::WrongArity { len: values.len() }
        );
    }

    #[rstest]
    fn degenerate_point_bbox_is_valid() {
        let point = bbox(1.0, 1.0, 1.0, 1.0);
        assert_eq!(point.width_deg(), 0.0);
        assert!(point.covers(&point));
    }

    #[rstest]
    fn equal_bboxes_cover_each_other() {
        let a = bbox(-95.82, 36.05, -95.81, 36.07);
        assert!(a.covers(&a.clone()));
    }

    #[rstest]
    #[case(bbox(-1.0, -1.0, 1.0, 1.0), bbox(-0.5, -0.5, 0.5, 0.5), true)]
    #[case(bbox(-1.0, -1.0, 1.0, 1.0), bbox(-0.5, -0.5, 1.5, 0.5), false)]
    #[case(bbox(-1.0, -1.0, 1.0, 1.0), bbox(-1.5, -0.5, 0.5, 0.5), false)]
    #[case(bbox(-1.0, -1.0, 1.0, 1.0), bbox(-0.5, -1.5, 0.5, 0.5), false)]
    #[case(bbox(-1.0, -1.0, 1.0, 1.0), bbox(-0.5, -0.5, 0.5, 1.5), false)]
    fn covers_requires_every_edge(#[case] outer: Bbox, #[case] query: Bbox, #[case] expected: bool) {
        assert_eq!(outer.covers(&query), expected);
    }

    #[rstest]
    #[case(bbox(0.0, 0.0, 1.0, 1.0), bbox(0.5, 0.5, 2.0, 2.0), true)]
    #[case(bbox(0.0, 0.0, 1.0, 1.0), bbox(1.0, 1.0, 2.0, 2.0), true)] // touching corner
    #[case(bbox(0.0, 0.0, 1.0, 1.0), bbox(1.1, 0.0, 2.0, 1.0), false)]
    #[case(bbox(0.0, 0.0, 1.0, 1.0), bbox(0.0, 1.1, 1.0, 2.0), false)]
    fn overlap_is_symmetric(#[case] a: Bbox, #[case] b: Bbox, #[case] expected: bool) {
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }

    #[rstest]
    fn serialises_as_four_element_list() {
        let value = bbox(-95.82, 36.05, -95.81, 36.07);
        let json = serde_json::to_string(&value).expect("serialise");
        assert_eq!(json, "[-95.82,36.05,-95.81,36.07]");
        let back: Bbox = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, value);
    }

    #[rstest]
    fn deserialising_inverted_list_fails() {
        let result: Result<Bbox, _> = serde_json::from_str("[1.0, 0.0, 0.0, 1.0]");
        assert!(result.is_err());
    }
}
