//! Facade crate for the rooftally building-footprint engine.
//!
//! This crate re-exports the core domain types and, behind the `data`
//! feature, the durable area store and caching service.

#![forbid(unsafe_code)]

pub use rooftally_core::{
    AreaId, AreaRef, Bbox, BboxError, CacheRequest, CachedArea, Footprint, FootprintSource,
    FootprintSummary, RegionError, SizeEstimate, SourceError, bounding_box, estimate_size,
    refine_to_circle, summarise,
};

#[cfg(feature = "data")]
pub use rooftally_data::{
    AreaCacheService, AreaStore, AreaStoreError, BuildingCount, CacheEstimate, ResolvedFrom,
    ServiceConfig, ServiceError, TaskId, TaskProgress, TaskStatus,
};

#[cfg(feature = "data")]
pub use rooftally_data::source::{HttpFootprintSource, HttpFootprintSourceConfig};
