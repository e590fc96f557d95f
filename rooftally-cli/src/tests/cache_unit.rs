//! Unit tests for the `cache` command's configuration and progress relay.

use super::helpers::{CacheDir, sample_bbox};
use super::*;
use crate::cache::{CacheConfig, follow_caching};
use geo::Coord;
use rooftally_core::test_support::{StubFootprintSource, square_footprint};
use rooftally_core::{CacheRequest, SourceError};
use rooftally_data::{AreaCacheService, ServiceConfig};
use rstest::rstest;
use std::sync::Arc;

fn service(cache: &CacheDir, source: StubFootprintSource) -> AreaCacheService {
    AreaCacheService::new(
        Arc::new(cache.store()),
        Arc::new(source),
        ServiceConfig::default(),
    )
}

fn cache_args() -> CacheArgs {
    CacheArgs {
        bbox: Some("18.06,59.33,18.08,59.34".to_owned()),
        name: Some("old town".to_owned()),
        ..CacheArgs::default()
    }
}

#[rstest]
fn cache_requires_a_name() {
    let args = CacheArgs {
        name: None,
        ..cache_args()
    };
    let err = CacheConfig::try_from(args).expect_err("missing name");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_NAME,
            env: ENV_CACHE_NAME
        }
    ));
}

#[rstest]
fn cache_centres_on_the_bbox_by_default() {
    let config = CacheConfig::try_from(cache_args()).expect("config");
    assert_eq!(config.request.center, sample_bbox().center());
    assert_eq!(config.request.radius_km, None);
}

#[rstest]
fn cache_records_an_explicit_centre_and_radius() {
    let args = CacheArgs {
        lat: Some(59.335),
        lon: Some(18.07),
        radius_km: Some(0.5),
        ..cache_args()
    };
    let config = CacheConfig::try_from(args).expect("config");
    assert_eq!(config.request.center, Coord { x: 18.07, y: 59.335 });
    assert_eq!(config.request.radius_km, Some(0.5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn following_a_task_returns_the_new_area() {
    let cache = CacheDir::new();
    let source = StubFootprintSource::with_footprints(vec![
        square_footprint("a", 18.061, 59.331),
        square_footprint("b", 18.075, 59.338),
    ]);
    let service = service(&cache, source);
    let mut progress = Vec::new();

    let area = follow_caching(
        &service,
        CacheRequest::new(sample_bbox(), "old town"),
        &mut progress,
    )
    .await
    .expect("caching succeeds")
    .expect("area created");

    assert_eq!(area.entity_count, 2);
    assert_eq!(area.name, "old town");
    let lines = String::from_utf8(progress).expect("utf-8 progress");
    let last = lines.lines().last().expect("progress lines");
    assert!(last.starts_with("[100%]"), "unexpected last line {last:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn following_an_empty_region_yields_no_area() {
    let cache = CacheDir::new();
    let service = service(&cache, StubFootprintSource::empty());
    let mut progress = Vec::new();

    let area = follow_caching(
        &service,
        CacheRequest::new(sample_bbox(), "field"),
        &mut progress,
    )
    .await
    .expect("caching succeeds");

    assert!(area.is_none());
    assert!(cache.store().list().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn following_a_failed_task_reports_the_error() {
    let cache = CacheDir::new();
    let service = service(&cache, StubFootprintSource::with_error(SourceError::Timeout));
    let mut progress = Vec::new();

    let err = follow_caching(
        &service,
        CacheRequest::new(sample_bbox(), "harbour"),
        &mut progress,
    )
    .await
    .expect_err("caching fails");

    match err {
        CliError::CachingFailed { message } => {
            assert_eq!(message, SourceError::Timeout.to_string());
        }
        other => panic!("expected CachingFailed, found {other:?}"),
    }
}
