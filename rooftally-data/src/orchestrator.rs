//! Resolve point-radius queries through memo cache, area store and remote
//! source, in that order.

use std::sync::Arc;

use geo::Coord;
use log::{debug, warn};
use rooftally_core::bbox::validate_coord;
use rooftally_core::{
    AreaId, Bbox, Footprint, FootprintSource, FootprintSummary, RegionError, SourceError,
    bounding_box, dedupe_by_id, refine_to_circle, summarise,
};
use serde::Serialize;
use thiserror::Error;

use crate::AreaStore;
use crate::memo::MemoQueryCache;

/// Largest accepted query radius.
pub const MAX_QUERY_RADIUS_M: f64 = 10_000.0;

/// Tier that answered a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum ResolvedFrom {
    /// The in-memory memo cache.
    Memory,
    /// A durable cached area that covers the query box.
    AreaCache {
        /// Area that supplied the footprints.
        area_id: AreaId,
    },
    /// The remote footprint source.
    Remote,
}

/// Footprints within a query circle and where they came from.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Footprints intersecting the circle.
    pub footprints: Arc<[Footprint]>,
    /// Tier that answered.
    pub resolved_from: ResolvedFrom,
}

/// Building count for a query circle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingCount {
    /// Query centre.
    #[serde(skip)]
    pub center: Coord<f64>,
    /// Query radius in metres.
    pub radius_m: f64,
    /// Count and area totals.
    #[serde(flatten)]
    pub summary: FootprintSummary,
    /// Tier that answered.
    pub resolved_from: ResolvedFrom,
}

/// Errors surfaced by [`FetchOrchestrator`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The centre or radius was rejected before any lookup.
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// Why the query was rejected.
        reason: String,
    },
    /// The bounding box could not be derived.
    #[error(transparent)]
    Region(#[from] RegionError),
    /// Neither cache could answer and the remote fetch failed.
    #[error("remote fetch failed: {0}")]
    Remote(#[from] SourceError),
}

/// Query resolver over the three data tiers.
///
/// Cloning shares the underlying store, source and memo cache.
#[derive(Clone)]
pub struct FetchOrchestrator {
    store: Arc<AreaStore>,
    source: Arc<dyn FootprintSource>,
    memo: Arc<MemoQueryCache>,
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("store", &self.store)
            .field("memo", &self.memo)
            .finish_non_exhaustive()
    }
}

impl FetchOrchestrator {
    /// Build an orchestrator over the given tiers.
    pub fn new(
        store: Arc<AreaStore>,
        source: Arc<dyn FootprintSource>,
        memo: Arc<MemoQueryCache>,
    ) -> Self {
        Self {
            store,
            source,
            memo,
        }
    }

    /// The memo cache consulted first.
    #[must_use]
    pub fn memo(&self) -> &MemoQueryCache {
        &self.memo
    }

    /// Footprints intersecting the circle of `radius_m` metres around
    /// `center`.
    ///
    /// Area-store problems (corrupt or dangling entries, empty datasets) are
    /// logged and fall through to the remote source. Results from either
    /// lower tier are memoised; nothing is written to the area store.
    pub fn resolve(&self, center: Coord<f64>, radius_m: f64) -> Result<Resolution, QueryError> {
        validate_query(center, radius_m)?;
        let (lat, lon) = (center.y, center.x);

        if let Some(footprints) = self.memo.get(lat, lon, radius_m) {
            debug!("memo hit for ({lat}, {lon}) r={radius_m}");
            return Ok(Resolution {
                footprints,
                resolved_from: ResolvedFrom::Memory,
            });
        }

        let bbox = bounding_box(center, radius_m)?;

        if let Some((area_id, candidates)) = self.from_area_store(&bbox) {
            let footprints: Arc<[Footprint]> =
                refine_to_circle(&candidates, center, radius_m).into();
            self.memo.put(lat, lon, radius_m, Arc::clone(&footprints));
            debug!("area {area_id} answered ({lat}, {lon}) r={radius_m}");
            return Ok(Resolution {
                footprints,
                resolved_from: ResolvedFrom::AreaCache { area_id },
            });
        }

        let raw = dedupe_by_id(self.source.fetch_all(&bbox)?);
        let footprints: Arc<[Footprint]> = refine_to_circle(&raw, center, radius_m).into();
        self.memo.put(lat, lon, radius_m, Arc::clone(&footprints));
        debug!(
            "remote answered ({lat}, {lon}) r={radius_m} with {} footprints",
            footprints.len()
        );
        Ok(Resolution {
            footprints,
            resolved_from: ResolvedFrom::Remote,
        })
    }

    /// Count the footprints within the circle and total their areas.
    pub fn count(&self, center: Coord<f64>, radius_m: f64) -> Result<BuildingCount, QueryError> {
        let resolution = self.resolve(center, radius_m)?;
        Ok(BuildingCount {
            center,
            radius_m,
            summary: summarise(resolution.footprints.iter(), center),
            resolved_from: resolution.resolved_from,
        })
    }

    fn from_area_store(&self, bbox: &Bbox) -> Option<(AreaId, Vec<Footprint>)> {
        let area = self.store.find_covering(bbox)?;
        match self.store.load(&area.id) {
            Ok(Some(dataset)) if dataset.footprints.is_empty() => {
                warn!("cached area {} is empty; querying remote", area.id);
                None
            }
            Ok(Some(dataset)) => Some((area.id, dataset.into_clipped(bbox))),
            Ok(None) => {
                warn!("cached area {} is dangling; querying remote", area.id);
                None
            }
            Err(err) => {
                warn!("cached area {} unusable ({err}); querying remote", area.id);
                None
            }
        }
    }
}

fn validate_query(center: Coord<f64>, radius_m: f64) -> Result<(), QueryError> {
    validate_coord(center).map_err(|err| QueryError::InvalidQuery {
        reason: err.to_string(),
    })?;
    if !radius_m.is_finite() || radius_m <= 0.0 || radius_m > MAX_QUERY_RADIUS_M {
        return Err(QueryError::InvalidQuery {
            reason: format!("radius must be in (0, {MAX_QUERY_RADIUS_M}] metres, got {radius_m}"),
        });
    }
    Ok(())
}
