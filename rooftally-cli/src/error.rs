//! Error types emitted by the rooftally CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use rooftally_core::BboxError;
use rooftally_data::source::SourceBuildError;
use rooftally_data::{AreaStoreError, ServiceError};
use thiserror::Error;

/// Errors emitted by the rooftally CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A bbox argument held something other than comma-separated numbers.
    #[error("invalid bbox {value:?}: {reason}")]
    InvalidBbox { value: String, reason: String },
    /// A bbox argument parsed but failed validation.
    #[error("invalid bbox {value:?}: {source}")]
    RejectedBbox {
        value: String,
        #[source]
        source: BboxError,
    },
    /// Opening the cache directory failed.
    #[error("failed to open cache directory {path:?}: {source}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: AreaStoreError,
    },
    /// Constructing the footprint source failed.
    #[error("failed to build footprint source for {base_url:?}: {source}")]
    BuildSource {
        base_url: String,
        #[source]
        source: SourceBuildError,
    },
    /// Building the async runtime failed.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The service rejected or failed the operation.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// A direct store operation failed.
    #[error(transparent)]
    Store(#[from] AreaStoreError),
    /// No cached area has the requested id.
    #[error("no cached area with id {id}")]
    AreaNotFound { id: String },
    /// The caching task reported an error.
    #[error("caching failed: {message}")]
    CachingFailed { message: String },
    /// Progress stopped arriving before the task finished.
    #[error("caching task {task} did not finish within the progress window")]
    CachingTimedOut { task: String },
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
