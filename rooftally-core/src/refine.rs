//! Narrow bbox-prefiltered footprints to a true circle.

use std::f64::consts::TAU;

use geo::{Area, Coord, Intersects, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::Footprint;
use crate::projection::UtmZone;
use crate::region::round_to;

/// Vertices used to approximate the search circle.
pub const CIRCLE_SEGMENTS: usize = 64;

/// Count and planar area of a set of footprints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootprintSummary {
    /// Number of footprints.
    pub count: usize,
    /// Sum of projected areas in square metres, rounded to two decimals.
    pub total_area_sqm: f64,
    /// Mean projected area in square metres, rounded to two decimals.
    pub avg_area_sqm: f64,
}

/// Keep the footprints that intersect the circle of `radius_m` metres around
/// `center`.
///
/// Candidates and centre are projected into the centre's UTM zone; the circle
/// is a polygon with [`CIRCLE_SEGMENTS`] vertices. Input order is preserved.
pub fn refine_to_circle<'a, I>(footprints: I, center: Coord<f64>, radius_m: f64) -> Vec<Footprint>
where
    I: IntoIterator<Item = &'a Footprint>,
{
    let zone = UtmZone::for_coord(center);
    let circle = circle_polygon(zone.project(center), radius_m);
    footprints
        .into_iter()
        .filter(|footprint| {
            !footprint.is_empty()
                && zone
                    .project_multi_polygon(&footprint.geometry)
                    .intersects(&circle)
        })
        .cloned()
        .collect()
}

/// Count `footprints` and sum their areas in the UTM zone of `center`.
pub fn summarise<'a, I>(footprints: I, center: Coord<f64>) -> FootprintSummary
where
    I: IntoIterator<Item = &'a Footprint>,
{
    let zone = UtmZone::for_coord(center);
    let (count, total) = footprints.into_iter().fold((0_usize, 0.0_f64), |(n, sum), fp| {
        (n + 1, sum + zone.project_multi_polygon(&fp.geometry).unsigned_area())
    });
    let avg = if count == 0 { 0.0 } else { total / count as f64 };
    FootprintSummary {
        count,
        total_area_sqm: round_to(total, 2),
        avg_area_sqm: round_to(avg, 2),
    }
}

fn circle_polygon(center: Coord<f64>, radius_m: f64) -> Polygon<f64> {
    let mut ring: Vec<Coord<f64>> = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let theta = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
            Coord {
                x: center.x + radius_m * theta.cos(),
                y: center.y + radius_m * theta.sin(),
            }
        })
        .collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    Polygon::new(LineString::from(ring), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, polygon};
    use rstest::{fixture, rstest};

    const CENTER: Coord<f64> = Coord { x: -95.815, y: 36.06 };

    /// A small square footprint offset from `CENTER` by the given degrees.
    fn square_at(id: &str, dx: f64, dy: f64) -> Footprint {
        let x = CENTER.x + dx;
        let y = CENTER.y + dy;
        let s = 0.0001;
        Footprint::new(
            id,
            polygon![(x: x, y: y), (x: x + s, y: y), (x: x + s, y: y + s), (x: x, y: y + s), (x: x, y: y)],
        )
    }

    #[fixture]
    fn candidates() -> Vec<Footprint> {
        vec![
            square_at("inside", 0.0, 0.0),
            // Corner of a 1 km box: inside the bbox, outside the circle.
            square_at("corner", 0.0105, 0.0085),
            square_at("edge", 0.0, 0.0085),
        ]
    }

    #[rstest]
    fn keeps_only_footprints_inside_circle(candidates: Vec<Footprint>) {
        let kept = refine_to_circle(&candidates, CENTER, 1_000.0);
        let ids: Vec<&str> = kept.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["inside", "edge"]);
    }

    #[rstest]
    fn empty_input_yields_empty_output() {
        assert!(refine_to_circle(&Vec::<Footprint>::new(), CENTER, 1_000.0).is_empty());
    }

    #[rstest]
    fn empty_geometry_never_intersects() {
        let hollow = Footprint::new("hollow", MultiPolygon::<f64>::new(Vec::new()));
        assert!(refine_to_circle([&hollow], CENTER, 1_000.0).is_empty());
    }

    #[rstest]
    fn summary_of_nothing_is_zero() {
        let summary = summarise(&Vec::<Footprint>::new(), CENTER);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.total_area_sqm, 0.0);
        assert_eq!(summary.avg_area_sqm, 0.0);
    }

    #[rstest]
    fn summary_areas_are_positive(candidates: Vec<Footprint>) {
        let summary = summarise(&candidates, CENTER);
        assert_eq!(summary.count, 3);
        // A 0.0001° square at 36° is roughly 11 m by 9 m.
        assert!(summary.avg_area_sqm > 80.0 && summary.avg_area_sqm < 120.0);
        assert!((summary.total_area_sqm - summary.avg_area_sqm * 3.0).abs() < 0.05);
    }
}
