//! Storage, caching and task plumbing for rooftally.
//!
//! Responsibilities:
//! - Persist materialised regions on disk ([`AreaStore`]).
//! - Memoise recent point-radius queries ([`MemoQueryCache`]).
//! - Resolve queries across memo, disk and remote tiers
//!   ([`FetchOrchestrator`]).
//! - Run caching work in the background and expose its progress
//!   ([`tasks`], [`AreaCacheService`]).
//! - Fetch footprints over HTTP ([`source::HttpFootprintSource`]).
//!
//! Boundaries:
//! - Do not encode region maths or geometry rules (live in `rooftally-core`).
//! - Keep blocking I/O off async executors; blocking work goes through
//!   [`tasks::WorkerPool`].
//!
//! Invariants:
//! - One process-wide store per root directory, shared by `Arc`.
//! - No global mutable state.

pub mod area_store;
pub mod memo;
pub mod orchestrator;
pub mod service;
pub mod source;
pub mod tasks;

pub use area_store::{
    AreaDataset, AreaStore, AreaStoreError, NoProgress, ProgressSink, StoreStats,
};
pub use memo::{MemoConfig, MemoQueryCache};
pub use orchestrator::{BuildingCount, FetchOrchestrator, QueryError, Resolution, ResolvedFrom};
pub use service::{AreaCacheService, CacheEstimate, ServiceConfig, ServiceError};
pub use tasks::{TaskId, TaskProgress, TaskRegistry, TaskStatus, WorkerPool};
