//! Focused unit tests covering argument validation and the store commands.

use super::helpers::{CacheDir, parse, run_json};
use super::*;
use crate::areas::{DeleteArgs, DeleteConfig, StoreArgs, run_delete};
use crate::count::{CountConfig, CountReport, DEFAULT_RADIUS_KM};
use crate::estimate::EstimateConfig;
use crate::settings::{DEFAULT_CACHE_DIR, Settings, parse_bbox};
use camino::Utf8PathBuf;
use geo::Coord;
use rooftally_core::{AreaId, BboxError, FootprintSummary};
use rooftally_data::{BuildingCount, ResolvedFrom};
use rstest::rstest;
use std::time::Duration;

#[rstest]
#[case(None, Some(18.07), ARG_LAT, ENV_COUNT_LAT)]
#[case(Some(59.33), None, ARG_LON, ENV_COUNT_LON)]
fn count_without_coordinates_errors(
    #[case] lat: Option<f64>,
    #[case] lon: Option<f64>,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let args = CountArgs {
        lat,
        lon,
        ..CountArgs::default()
    };
    let err = CountConfig::try_from(args).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn count_fills_defaults() {
    let args = CountArgs {
        lat: Some(59.33),
        lon: Some(18.07),
        ..CountArgs::default()
    };
    let config = CountConfig::try_from(args).expect("config");
    assert_eq!(config.center, Coord { x: 18.07, y: 59.33 });
    assert!((config.radius_km - DEFAULT_RADIUS_KM).abs() < f64::EPSILON);
    assert_eq!(config.settings.cache_dir, Utf8PathBuf::from(DEFAULT_CACHE_DIR));
}

#[rstest]
fn settings_take_explicit_values() {
    let settings = Settings::from_options(
        Some(Utf8PathBuf::from("/tmp/tally")),
        Some("http://footprints.test".to_owned()),
        Some(5),
    );
    assert_eq!(settings.cache_dir, Utf8PathBuf::from("/tmp/tally"));
    assert_eq!(settings.source_url, "http://footprints.test");
    assert_eq!(settings.timeout, Duration::from_secs(5));
}

#[rstest]
fn count_report_describes_the_result() {
    let config = CountConfig {
        center: Coord { x: 18.07, y: 59.33 },
        radius_km: 0.5,
        settings: Settings::from_options(None, None, None),
    };
    let count = BuildingCount {
        center: config.center,
        radius_m: 500.0,
        summary: FootprintSummary {
            count: 3,
            total_area_sqm: 120.0,
            avg_area_sqm: 40.0,
        },
        resolved_from: ResolvedFrom::Memory,
    };
    let report = CountReport::new(&config, count);
    assert_eq!(report.message, "Found 3 buildings within 0.5km");
    let json = serde_json::to_value(&report).expect("serialise report");
    assert_eq!(json["count"], 3);
    assert_eq!(json["radius_meters"], 500.0);
    assert_eq!(json["resolved_from"]["tier"], "memory");
}

#[rstest]
fn parse_bbox_accepts_padded_values() {
    let bbox = parse_bbox(" 18.06, 59.33,18.08 ,59.34").expect("bbox");
    assert!((bbox.min_lon() - 18.06).abs() < f64::EPSILON);
    assert!((bbox.max_lat() - 59.34).abs() < f64::EPSILON);
}

#[rstest]
#[case("18.06,59.33,18.08")]
#[case("18.06,59.33,18.08,59.34,1")]
fn parse_bbox_rejects_wrong_arity(#[case] raw: &str) {
    match parse_bbox(raw) {
        Err(CliError::RejectedBbox {
            source: BboxError::WrongArity { .. },
            ..
        }) => {}
        other => panic!("expected WrongArity, found {other:?}"),
    }
}

#[rstest]
#[case("")]
#[case("west,59.33,18.08,59.34")]
fn parse_bbox_rejects_non_numbers(#[case] raw: &str) {
    match parse_bbox(raw) {
        Err(CliError::InvalidBbox { value, .. }) => assert_eq!(value, raw),
        other => panic!("expected InvalidBbox, found {other:?}"),
    }
}

#[rstest]
fn parse_bbox_rejects_inverted_edges() {
    match parse_bbox("18.08,59.33,18.06,59.34") {
        Err(CliError::RejectedBbox {
            source: BboxError::Inverted { .. },
            ..
        }) => {}
        other => panic!("expected Inverted, found {other:?}"),
    }
}

#[rstest]
fn estimate_requires_a_bbox() {
    let err = EstimateConfig::try_from(EstimateArgs::default()).expect_err("missing bbox");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_BBOX,
            env: ENV_ESTIMATE_BBOX
        }
    ));
}

#[rstest]
fn negative_coordinates_parse_as_values() {
    let command = parse(&["count", "--lat", "-33.92", "--lon", "-70.6"]).expect("parse");
    match command {
        Command::Count(args) => {
            assert_eq!(args.lat, Some(-33.92));
            assert_eq!(args.lon, Some(-70.6));
        }
        other => panic!("expected count, found {other:?}"),
    }
}

#[rstest]
fn listing_reports_seeded_areas() {
    let cache = CacheDir::new();
    let area = cache.seed_area("old town", 2);
    let json = run_json(Command::Areas(AreasArgs {
        command: AreasCommand::List(StoreArgs {
            cache_dir: Some(cache.root().to_path_buf()),
        }),
    }))
    .expect("list");
    assert_eq!(json["count"], 1);
    assert_eq!(json["areas"][0]["id"], area.id.as_str());
    assert_eq!(json["areas"][0]["entity_count"], 2);
}

#[rstest]
fn stats_sum_every_area() {
    let cache = CacheDir::new();
    cache.seed_area("north", 2);
    cache.seed_area("south", 3);
    let json = run_json(Command::Areas(AreasArgs {
        command: AreasCommand::Stats(StoreArgs {
            cache_dir: Some(cache.root().to_path_buf()),
        }),
    }))
    .expect("stats");
    assert_eq!(json["total_areas"], 2);
    assert_eq!(json["total_entities"], 5);
}

#[rstest]
fn estimate_lists_overlapping_areas() {
    let cache = CacheDir::new();
    let area = cache.seed_area("harbour", 1);
    let json = run_json(Command::Estimate(EstimateArgs {
        bbox: Some("18.07,59.335,18.09,59.345".to_owned()),
        cache_dir: Some(cache.root().to_path_buf()),
    }))
    .expect("estimate");
    assert_eq!(json["overlapping_areas"][0]["id"], area.id.as_str());
    assert!(json["estimated_entities"].as_u64().expect("entities") > 0);
}

#[rstest]
fn deleting_an_unknown_area_errors() {
    let cache = CacheDir::new();
    let config = DeleteConfig {
        id: AreaId::from("deadbeef"),
        cache_dir: cache.root().to_path_buf(),
    };
    let mut out = Vec::new();
    match run_delete(&config, &mut out) {
        Err(CliError::AreaNotFound { id }) => assert_eq!(id, "deadbeef"),
        other => panic!("expected AreaNotFound, found {other:?}"),
    }
    assert!(out.is_empty());
}

#[rstest]
fn deleting_a_known_area_removes_it() {
    let cache = CacheDir::new();
    let area = cache.seed_area("park", 1);
    let config = DeleteConfig::try_from(DeleteArgs {
        id: Some(area.id.to_string()),
        cache_dir: Some(cache.root().to_path_buf()),
    })
    .expect("config");
    let mut out = Vec::new();
    run_delete(&config, &mut out).expect("delete");
    let json: serde_json::Value = serde_json::from_slice(&out).expect("json");
    assert_eq!(json["deleted"], area.id.as_str());
    assert!(cache.store().list().is_empty());
}

#[rstest]
fn store_commands_layer_the_cache_dir() {
    use crate::areas::cache_dir_from_layers_for_test;
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(json!({ "cache_dir": "/srv/from-file" }), None);
    composer.push_environment(json!({ "cache_dir": "/srv/from-env" }));
    let dir = cache_dir_from_layers_for_test(composer.layers()).expect("merged");
    assert_eq!(dir, Utf8PathBuf::from("/srv/from-env"));

    let mut composer = MergeComposer::new();
    composer.push_environment(json!({ "cache_dir": "/srv/from-env" }));
    composer.push_cli(json!({ "cache_dir": "/srv/from-cli" }));
    let dir = cache_dir_from_layers_for_test(composer.layers()).expect("merged");
    assert_eq!(dir, Utf8PathBuf::from("/srv/from-cli"));

    let dir = cache_dir_from_layers_for_test(MergeComposer::new().layers()).expect("merged");
    assert_eq!(dir, Utf8PathBuf::from(DEFAULT_CACHE_DIR));
}
