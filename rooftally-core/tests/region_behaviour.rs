//! Behavioural tests for region sizing and validation.

use geo::Coord;
use rooftally_core::region::{DEFAULT_DENSITY_PER_KM2, EARTH_RADIUS_M};
use rooftally_core::{
    Bbox, MAX_CACHE_AREA_KM2, RegionError, SizeEstimate, bounding_box, validate_cache_region,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

/// Circle under test: centre and radius in metres.
type Circle = (Coord<f64>, f64);

#[fixture]
fn region() -> RefCell<Option<Bbox>> {
    RefCell::new(None)
}

#[fixture]
fn circle() -> RefCell<Option<Circle>> {
    RefCell::new(None)
}

#[fixture]
fn outcome() -> RefCell<Option<Result<SizeEstimate, RegionError>>> {
    RefCell::new(None)
}

// --- Given steps ---

#[given("a bbox spanning one degree of longitude and latitude centred on 36 degrees north")]
fn one_degree_box(#[from(region)] region: &RefCell<Option<Bbox>>) {
    *region.borrow_mut() = Some(Bbox::new(-96.0, 35.5, -95.0, 36.5).expect("valid bbox"));
}

#[given("the bbox -95.82, 36.05, -95.81, 36.07")]
fn neighbourhood_box(#[from(region)] region: &RefCell<Option<Bbox>>) {
    *region.borrow_mut() = Some(Bbox::new(-95.82, 36.05, -95.81, 36.07).expect("valid bbox"));
}

#[given("a 1000 metre radius around -95.815, 36.06")]
fn radius_query(#[from(circle)] circle: &RefCell<Option<Circle>>) {
    *circle.borrow_mut() = Some((Coord { x: -95.815, y: 36.06 }, 1_000.0));
}

// --- When steps ---

#[when("I validate the region for caching")]
fn validate(
    #[from(region)] region: &RefCell<Option<Bbox>>,
    #[from(outcome)] outcome: &RefCell<Option<Result<SizeEstimate, RegionError>>>,
) {
    let bbox = region.borrow().expect("region must be initialised");
    *outcome.borrow_mut() = Some(validate_cache_region(&bbox));
}

#[when("I compute the bounding box")]
fn compute_box(
    #[from(circle)] circle: &RefCell<Option<Circle>>,
    #[from(region)] region: &RefCell<Option<Bbox>>,
) {
    let (center, radius_m) = circle.borrow().expect("circle must be initialised");
    *region.borrow_mut() = Some(bounding_box(center, radius_m).expect("bounding box"));
}

// --- Then steps ---

#[then("the region is rejected as too large")]
fn rejected(#[from(outcome)] outcome: &RefCell<Option<Result<SizeEstimate, RegionError>>>) {
    let borrowed = outcome.borrow();
    assert!(
        matches!(&*borrowed, Some(Err(RegionError::TooLarge { .. }))),
        "expected TooLarge, got {borrowed:?}"
    );
}

#[then("the estimated area is about 10025 square kilometres")]
fn area_about_limit(#[from(outcome)] outcome: &RefCell<Option<Result<SizeEstimate, RegionError>>>) {
    let borrowed = outcome.borrow();
    let Some(Err(RegionError::TooLarge { area_km2, limit_km2 })) = &*borrowed else {
        panic!("expected TooLarge, got {borrowed:?}");
    };
    assert!((area_km2 - 10_025.0).abs() < 5.0, "area was {area_km2}");
    assert_eq!(*limit_km2, MAX_CACHE_AREA_KM2);
}

#[then("the region is accepted")]
fn accepted(#[from(outcome)] outcome: &RefCell<Option<Result<SizeEstimate, RegionError>>>) {
    let borrowed = outcome.borrow();
    assert!(
        matches!(&*borrowed, Some(Ok(_))),
        "expected Ok, got {borrowed:?}"
    );
}

#[then("the estimated entities equal the area times 200")]
fn entities_follow_density(
    #[from(outcome)] outcome: &RefCell<Option<Result<SizeEstimate, RegionError>>>,
) {
    let borrowed = outcome.borrow();
    let Some(Ok(estimate)) = &*borrowed else {
        panic!("expected Ok, got {borrowed:?}");
    };
    let expected = estimate.area_km2 * DEFAULT_DENSITY_PER_KM2;
    // The count is taken from the unrounded area.
    assert!((estimate.estimated_entities as f64 - expected).abs() <= 2.0);
}

#[then("the box contains every point of the circle")]
fn box_contains_circle(
    #[from(circle)] circle: &RefCell<Option<Circle>>,
    #[from(region)] region: &RefCell<Option<Bbox>>,
) {
    let (center, radius_m) = circle.borrow().expect("circle must be initialised");
    let bbox = region.borrow().expect("box must be computed");
    let angular = radius_m / EARTH_RADIUS_M;
    let lat = center.y.to_radians();
    let lon = center.x.to_radians();
    for step in 0..360 {
        let bearing = f64::from(step).to_radians();
        let point_lat = (lat.sin() * angular.cos() + lat.cos() * angular.sin() * bearing.cos())
            .asin();
        let point_lon = lon
            + (bearing.sin() * angular.sin() * lat.cos())
                .atan2(angular.cos() - lat.sin() * point_lat.sin());
        let point = Coord {
            x: point_lon.to_degrees(),
            y: point_lat.to_degrees(),
        };
        assert!(
            point.x >= bbox.min_lon() - 1e-9
                && point.x <= bbox.max_lon() + 1e-9
                && point.y >= bbox.min_lat() - 1e-9
                && point.y <= bbox.max_lat() + 1e-9,
            "{point:?} escapes {bbox}"
        );
    }
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/region.feature", name = $title)]
        fn $fn_name(
            region: RefCell<Option<Bbox>>,
            circle: RefCell<Option<Circle>>,
            outcome: RefCell<Option<Result<SizeEstimate, RegionError>>>,
        ) {
            let _ = (region, circle, outcome);
        }
    };
}

register_scenario!(
    rejecting_one_degree_square,
    "rejecting a one degree square at 36 degrees"
);
register_scenario!(accepting_small_neighbourhood, "accepting a small neighbourhood");
register_scenario!(bounding_point_radius_query, "bounding a point radius query");
