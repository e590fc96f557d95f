//! Universal Transverse Mercator forward projection on the WGS84 ellipsoid.
//!
//! Only the forward direction is needed: circular refinement and area
//! summaries both work in projected metres and never map back.

use geo::{Coord, MapCoords, MultiPolygon};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Hemisphere of a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    /// Latitudes `>= 0`.
    North,
    /// Latitudes `< 0`.
    South,
}

/// A UTM zone chosen from a WGS84 position.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use rooftally_core::projection::{Hemisphere, UtmZone};
///
/// let zone = UtmZone::for_coord(Coord { x: -95.8, y: 36.1 });
/// assert_eq!(zone.number(), 15);
/// assert_eq!(zone.hemisphere(), Hemisphere::North);
/// assert_eq!(zone.epsg(), 32615);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    number: u8,
    hemisphere: Hemisphere,
}

impl UtmZone {
    /// Zone containing `coord` (`x = longitude`, `y = latitude`).
    ///
    /// Longitude 180° folds into zone 60.
    #[must_use]
    pub fn for_coord(coord: Coord<f64>) -> Self {
        let raw = ((coord.x + 180.0) / 6.0).floor() + 1.0;
        let number = raw.clamp(1.0, 60.0) as u8;
        let hemisphere = if coord.y >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        };
        Self { number, hemisphere }
    }

    /// Zone number in `1..=60`.
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.number
    }

    /// Hemisphere of the zone.
    #[must_use]
    pub const fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    /// EPSG code of the matching WGS84 / UTM coordinate reference system.
    #[must_use]
    pub fn epsg(&self) -> u32 {
        let base = match self.hemisphere {
            Hemisphere::North => 32_600,
            Hemisphere::South => 32_700,
        };
        base + u32::from(self.number)
    }

    /// Central meridian in degrees.
    #[must_use]
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }

    /// Project a WGS84 position to easting/northing metres in this zone.
    #[must_use]
    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let phi = coord.y.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * (coord.x - self.central_meridian()).to_radians();

        let m = WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let easting = K0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
            + FALSE_EASTING;
        let mut northing = K0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));
        if self.hemisphere == Hemisphere::South {
            northing += FALSE_NORTHING_SOUTH;
        }

        Coord {
            x: easting,
            y: northing,
        }
    }

    /// Project every vertex of `geometry`.
    #[must_use]
    pub fn project_multi_polygon(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let zone = *self;
        geometry.map_coords(move |coord| zone.project(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-180.0, 1)]
    #[case(-177.0, 1)]
    #[case(-95.8, 15)]
    #[case(0.0, 31)]
    #[case(179.9, 60)]
    #[case(180.0, 60)]
    fn zone_numbers(#[case] lon: f64, #[case] expected: u8) {
        assert_eq!(UtmZone::for_coord(Coord { x: lon, y: 10.0 }).number(), expected);
    }

    #[rstest]
    fn southern_zone_uses_327xx() {
        let zone = UtmZone::for_coord(Coord { x: 151.2, y: -33.9 });
        assert_eq!(zone.hemisphere(), Hemisphere::South);
        assert_eq!(zone.epsg(), 32_756);
    }

    #[rstest]
    fn central_meridian_on_equator_maps_to_false_origin() {
        let zone = UtmZone::for_coord(Coord { x: 3.0, y: 0.0 });
        let projected = zone.project(Coord { x: 3.0, y: 0.0 });
        assert!((projected.x - 500_000.0).abs() < 1e-6);
        assert!(projected.y.abs() < 1e-6);
    }

    #[rstest]
    fn hundredth_degree_of_latitude_is_about_1105_m() {
        let zone = UtmZone::for_coord(Coord { x: 3.0, y: 0.0 });
        let a = zone.project(Coord { x: 3.0, y: 0.0 });
        let b = zone.project(Coord { x: 3.0, y: 0.01 });
        assert!((b.y - a.y - 1_105.3).abs() < 0.5, "got {}", b.y - a.y);
    }

    #[rstest]
    fn southern_hemisphere_adds_false_northing() {
        let zone = UtmZone::for_coord(Coord { x: 3.0, y: -0.01 });
        let projected = zone.project(Coord { x: 3.0, y: -0.01 });
        assert!((projected.y - (10_000_000.0 - 1_105.3)).abs() < 0.5);
    }
}
