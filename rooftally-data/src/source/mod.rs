//! Remote footprint source over HTTP.
//!
//! [`HttpFootprintSource`] implements [`rooftally_core::FootprintSource`]
//! against a service that serves GeoJSON footprints for a bounding box.
//! Large boxes are split into tiles with [`partition_bbox`] so each request
//! stays small and progress can be reported per tile.

mod geojson;
mod http;
mod partition;

pub use geojson::parse_feature_collection;
pub use http::{
    DEFAULT_TILE_DEGREES, HttpFootprintSource, HttpFootprintSourceConfig, SourceBuildError,
};
pub use partition::partition_bbox;
