use camino::Utf8PathBuf;
use rooftally_core::{AreaId, RegionError, SourceError};
use thiserror::Error;

use super::data_file::DataFileError;

/// Errors returned by [`crate::AreaStore`].
#[derive(Debug, Error)]
pub enum AreaStoreError {
    /// A filesystem operation on the store root failed.
    #[error("area store I/O failed for {path}: {source}")]
    Io {
        /// Path relative to the store root.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The index file exists but is not valid JSON.
    #[error("failed to decode area index {path}: {source}")]
    IndexDecode {
        /// Path relative to the store root.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The in-memory index could not be serialised.
    #[error("failed to encode area index: {source}")]
    IndexEncode {
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },
    /// An indexed area's data file exists but cannot be read.
    #[error("cached area {id} is unreadable: {source}")]
    CorruptEntry {
        /// Area whose data file failed to load.
        id: AreaId,
        /// Reason the file was rejected.
        #[source]
        source: DataFileError,
    },
    /// Writing a new area's data file failed.
    #[error("failed to write data for area {id}: {source}")]
    WriteData {
        /// Area being created.
        id: AreaId,
        /// Reason the write failed.
        #[source]
        source: DataFileError,
    },
    /// The requested region was rejected before downloading.
    #[error(transparent)]
    Region(#[from] RegionError),
    /// The footprint source failed while downloading.
    #[error(transparent)]
    Source(#[from] SourceError),
}
