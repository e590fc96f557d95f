use std::collections::HashSet;

use geo::{BoundingRect, MultiPolygon, Rect};
use rstar::{AABB, Envelope, RTreeObject};
use serde::{Deserialize, Serialize};

/// A building footprint returned by the remote source.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. Single
/// polygons are stored as one-member multipolygons so every footprint shares
/// the same geometry type.
///
/// # Examples
/// ```
/// use geo::polygon;
/// use rooftally_core::Footprint;
///
/// let footprint = Footprint::new(
///     "08b2a1",
///     polygon![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0), (x: 0.001, y: 0.001), (x: 0.0, y: 0.0)],
/// );
/// assert_eq!(footprint.id, "08b2a1");
/// assert_eq!(footprint.geometry.0.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Identifier assigned by the remote source.
    pub id: String,
    /// Outline of the structure.
    pub geometry: MultiPolygon<f64>,
}

impl Footprint {
    /// Construct a footprint from anything convertible to a multipolygon.
    pub fn new(id: impl Into<String>, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
        }
    }

    /// Bounding rectangle of the outline, or `None` for an empty geometry.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    /// Whether the outline contains no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

impl RTreeObject for Footprint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounding_rect().map_or_else(AABB::new_empty, |rect| {
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
        })
    }
}

/// Drop footprints whose id has already been seen, keeping the first copy.
///
/// Partitioned sources return a structure once per partition it touches.
pub fn dedupe_by_id(footprints: impl IntoIterator<Item = Footprint>) -> Vec<Footprint> {
    let mut seen = HashSet::new();
    footprints
        .into_iter()
        .filter(|footprint| seen.insert(footprint.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use rstest::rstest;

    fn unit_square(id: &str, x: f64, y: f64) -> Footprint {
        Footprint::new(
            id,
            polygon![
                (x: x, y: y),
                (x: x + 1.0, y: y),
                (x: x + 1.0, y: y + 1.0),
                (x: x, y: y + 1.0),
                (x: x, y: y),
            ],
        )
    }

    #[rstest]
    fn envelope_matches_bounding_rect() {
        let footprint = unit_square("a", 2.0, 3.0);
        let envelope = footprint.envelope();
        assert_eq!(envelope.lower(), [2.0, 3.0]);
        assert_eq!(envelope.upper(), [3.0, 4.0]);
    }

    #[rstest]
    fn empty_geometry_has_no_bounds() {
        let footprint = Footprint::new("empty", MultiPolygon::<f64>::new(Vec::new()));
        assert!(footprint.is_empty());
        assert!(footprint.bounding_rect().is_none());
    }

    #[rstest]
    fn dedupe_keeps_first_occurrence() {
        let first = unit_square("a", 0.0, 0.0);
        let duplicate = unit_square("a", 5.0, 5.0);
        let other = unit_square("b", 1.0, 1.0);

        let unique = dedupe_by_id(vec![first.clone(), other.clone(), duplicate]);

        assert_eq!(unique, vec![first, other]);
    }
}
