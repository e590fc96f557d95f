//! Core domain types for counting structures within a region.
//!
//! This crate holds the pieces that need no I/O: validated bounding boxes,
//! footprint and cached-area records, region sizing heuristics, the UTM
//! projection used for circular refinement, and the [`FootprintSource`] trait
//! implemented by remote footprint providers.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod area;
pub mod bbox;
pub mod footprint;
pub mod projection;
pub mod refine;
pub mod region;
pub mod source;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use area::{AreaId, AreaRef, CacheRequest, CachedArea};
pub use bbox::{Axis, Bbox, BboxError};
pub use footprint::{Footprint, dedupe_by_id};
pub use projection::{Hemisphere, UtmZone};
pub use refine::{FootprintSummary, refine_to_circle, summarise};
pub use region::{
    MAX_CACHE_AREA_KM2, RegionError, SizeEstimate, bounding_box, estimate_size,
    validate_cache_region,
};
pub use source::{FootprintBatch, FootprintBatches, FootprintSource, SourceError};
