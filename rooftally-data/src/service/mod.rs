//! Area caching and counting as one service.
//!
//! [`AreaCacheService`] is the surface the CLI (or any other front end)
//! drives: sizing a region, starting background caching tasks, observing
//! their progress, managing cached areas and answering count queries.

use std::sync::Arc;
use std::time::Duration;

use geo::Coord;
use log::{info, warn};
use rooftally_core::{
    AreaId, AreaRef, Bbox, CacheRequest, CachedArea, FootprintSource, RegionError, estimate_size,
    validate_cache_region,
};
use serde::Serialize;
use thiserror::Error;

use crate::area_store::{AreaStore, AreaStoreError, StoreStats};
use crate::memo::{MemoConfig, MemoQueryCache};
use crate::orchestrator::{BuildingCount, FetchOrchestrator, QueryError};
use crate::tasks::{
    DEFAULT_GRACE, DEFAULT_POLL_WINDOW, DEFAULT_WORKERS, PoolError, ProgressStream, TaskHandle,
    TaskId, TaskProgress, TaskRegistry, WorkerPool, progress_stream,
};

/// Errors surfaced by [`AreaCacheService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested region failed validation.
    #[error(transparent)]
    Region(#[from] RegionError),
    /// The area store failed.
    #[error(transparent)]
    Store(#[from] AreaStoreError),
    /// A count query failed.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// Blocking work could not be scheduled or did not finish.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Tunables for [`AreaCacheService`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceConfig {
    /// Concurrent blocking jobs.
    pub workers: usize,
    /// How long finished tasks remain visible.
    pub task_grace: Duration,
    /// Default observation window for [`AreaCacheService::progress_stream`].
    pub poll_window: Duration,
    /// Memo cache sizing.
    pub memo: MemoConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            task_grace: DEFAULT_GRACE,
            poll_window: DEFAULT_POLL_WINDOW,
            memo: MemoConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Set the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the finished-task grace period.
    #[must_use]
    pub fn with_task_grace(mut self, grace: Duration) -> Self {
        self.task_grace = grace;
        self
    }

    /// Set the progress observation window.
    #[must_use]
    pub fn with_poll_window(mut self, window: Duration) -> Self {
        self.poll_window = window;
        self
    }

    /// Set the memo cache sizing.
    #[must_use]
    pub fn with_memo(mut self, memo: MemoConfig) -> Self {
        self.memo = memo;
        self
    }
}

/// Pre-flight sizing of a region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEstimate {
    /// Region that was sized.
    pub bbox: Bbox,
    /// Area rounded to two decimals.
    pub area_km2: f64,
    /// Expected footprint count.
    pub estimated_entities: u64,
    /// Expected data file size.
    pub estimated_bytes: u64,
    /// Expected data file size in mebibytes, two decimals.
    pub estimated_size_mb: f64,
    /// Cached areas already overlapping the region.
    pub overlapping_areas: Vec<AreaRef>,
}

impl CacheEstimate {
    /// Size `bbox` and list the areas of `store` it overlaps.
    #[must_use]
    pub fn for_store(store: &AreaStore, bbox: &Bbox) -> Self {
        let size = estimate_size(bbox);
        Self {
            bbox: *bbox,
            area_km2: size.area_km2,
            estimated_entities: size.estimated_entities,
            estimated_bytes: size.estimated_bytes,
            estimated_size_mb: size.estimated_size_mb(),
            overlapping_areas: store
                .find_overlapping(bbox)
                .iter()
                .map(CachedArea::to_ref)
                .collect(),
        }
    }
}

/// Caching, progress and counting over one store and one remote source.
///
/// Clones share the store, tasks, pool and memo cache.
#[derive(Clone)]
pub struct AreaCacheService {
    store: Arc<AreaStore>,
    source: Arc<dyn FootprintSource>,
    registry: TaskRegistry,
    pool: WorkerPool,
    orchestrator: FetchOrchestrator,
    poll_window: Duration,
}

impl std::fmt::Debug for AreaCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaCacheService")
            .field("store", &self.store)
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .field("poll_window", &self.poll_window)
            .finish_non_exhaustive()
    }
}

impl AreaCacheService {
    /// Build a service with fresh task, pool and memo state.
    #[must_use]
    pub fn new(
        store: Arc<AreaStore>,
        source: Arc<dyn FootprintSource>,
        config: ServiceConfig,
    ) -> Self {
        Self::with_parts(
            store,
            source,
            Arc::new(MemoQueryCache::new(config.memo)),
            TaskRegistry::new(config.task_grace),
            WorkerPool::new(config.workers),
        )
        .with_poll_window(config.poll_window)
    }

    /// Build a service from existing collaborators.
    #[must_use]
    pub fn with_parts(
        store: Arc<AreaStore>,
        source: Arc<dyn FootprintSource>,
        memo: Arc<MemoQueryCache>,
        registry: TaskRegistry,
        pool: WorkerPool,
    ) -> Self {
        let orchestrator =
            FetchOrchestrator::new(Arc::clone(&store), Arc::clone(&source), memo);
        Self {
            store,
            source,
            registry,
            pool,
            orchestrator,
            poll_window: DEFAULT_POLL_WINDOW,
        }
    }

    /// Set the default observation window.
    #[must_use]
    pub fn with_poll_window(mut self, window: Duration) -> Self {
        self.poll_window = window;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &AreaStore {
        &self.store
    }

    /// The task registry.
    #[must_use]
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Size `bbox` and list the cached areas it overlaps.
    #[must_use]
    pub fn estimate(&self, bbox: &Bbox) -> CacheEstimate {
        CacheEstimate::for_store(&self.store, bbox)
    }

    /// Validate `request` and start caching it in the background.
    ///
    /// Oversized regions are rejected before any task exists. The returned
    /// id can be polled with [`Self::poll_progress`].
    ///
    /// # Errors
    ///
    /// [`ServiceError::Region`] for invalid regions and
    /// [`ServiceError::Pool`] when called outside a Tokio runtime. Neither
    /// leaves a task behind in the registry.
    pub fn start_caching(&self, request: CacheRequest) -> Result<TaskId, ServiceError> {
        validate_cache_region(&request.bbox)?;
        let runtime = WorkerPool::current_runtime()?;
        let handle = self.registry.create();
        let id = handle.id().clone();
        let store = Arc::clone(&self.store);
        let source = Arc::clone(&self.source);
        info!("task {id}: caching {} ({})", request.name, request.bbox);
        self.pool.spawn_on(&runtime, move || {
            run_caching(&store, source.as_ref(), &request, handle);
        });
        Ok(id)
    }

    /// Latest progress record of task `id`.
    #[must_use]
    pub fn poll_progress(&self, id: &TaskId) -> Option<TaskProgress> {
        self.registry.snapshot(id)
    }

    /// Follow task `id` for the configured window.
    #[must_use]
    pub fn progress_stream(&self, id: &TaskId) -> Option<ProgressStream> {
        progress_stream(&self.registry, id, self.poll_window)
    }

    /// Every cached area in insertion order.
    #[must_use]
    pub fn list_areas(&self) -> Vec<CachedArea> {
        self.store.list()
    }

    /// Totals over every cached area.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Delete one cached area. Returns whether it existed.
    pub fn delete_area(&self, id: &AreaId) -> Result<bool, ServiceError> {
        Ok(self.store.delete(id)?)
    }

    /// Delete every cached area and forget memoised queries.
    pub fn clear_all(&self) -> Result<usize, ServiceError> {
        let removed = self.store.clear()?;
        self.orchestrator.memo().clear();
        Ok(removed)
    }

    /// Count buildings within `radius_km` of `center`.
    ///
    /// The lookup runs on the worker pool since lower tiers block.
    pub async fn count(&self, center: Coord<f64>, radius_km: f64) -> Result<BuildingCount, ServiceError> {
        let orchestrator = self.orchestrator.clone();
        let radius_m = radius_km * 1_000.0;
        let count = self
            .pool
            .run(move || orchestrator.count(center, radius_m))
            .await??;
        Ok(count)
    }
}

fn run_caching(
    store: &AreaStore,
    source: &dyn FootprintSource,
    request: &CacheRequest,
    handle: TaskHandle,
) {
    match store.add(request, source, &handle) {
        Ok(area) => {
            if area.is_none() {
                info!("task {}: no footprints in {}", handle.id(), request.bbox);
            }
            handle.complete(area);
        }
        Err(err) => {
            warn!("task {} failed: {err}", handle.id());
            handle.fail(err.to_string());
        }
    }
}
