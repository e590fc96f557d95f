//! The `cache_index.json` file listing every cached area.

use std::io::{self, Write};
use std::time::SystemTime;

use cap_std::fs_utf8::Dir;
use chrono::{DateTime, Utc};
use rooftally_core::CachedArea;
use serde::{Deserialize, Serialize};

use super::error::AreaStoreError;

/// Name of the index file at the store root.
pub const INDEX_FILE_NAME: &str = "cache_index.json";

const INDEX_TEMP_NAME: &str = "cache_index.json.tmp";

/// Persisted list of cached areas, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaIndex {
    /// When the index was last written.
    pub updated_at: DateTime<Utc>,
    /// Areas in the order they were added.
    #[serde(default)]
    pub areas: Vec<CachedArea>,
}

impl AreaIndex {
    /// An index holding `areas`, stamped with the current time.
    #[must_use]
    pub fn new(areas: Vec<CachedArea>) -> Self {
        Self {
            updated_at: Utc::now(),
            areas,
        }
    }
}

/// Modification time of the index file, or `None` when it does not exist.
pub(crate) fn index_mtime(dir: &Dir) -> io::Result<Option<SystemTime>> {
    match dir.metadata(INDEX_FILE_NAME) {
        Ok(meta) => Ok(Some(meta.modified()?.into_std())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Read and decode the index file. A missing file yields `Ok(None)`.
pub(crate) fn read_index(dir: &Dir) -> Result<Option<AreaIndex>, AreaStoreError> {
    let text = match dir.read_to_string(INDEX_FILE_NAME) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AreaStoreError::Io {
                path: INDEX_FILE_NAME.into(),
                source,
            });
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| AreaStoreError::IndexDecode {
            path: INDEX_FILE_NAME.into(),
            source,
        })
}

/// Rewrite the whole index and return the new file's modification time.
///
/// The JSON is written to a temporary sibling, synced, then renamed over the
/// index so readers never see a partial file.
pub(crate) fn write_index(dir: &Dir, index: &AreaIndex) -> Result<SystemTime, AreaStoreError> {
    let io_err = |path: &str, source: io::Error| AreaStoreError::Io {
        path: path.into(),
        source,
    };
    let bytes =
        serde_json::to_vec_pretty(index).map_err(|source| AreaStoreError::IndexEncode { source })?;

    let mut file = dir
        .create(INDEX_TEMP_NAME)
        .map_err(|e| io_err(INDEX_TEMP_NAME, e))?;
    file.write_all(&bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| io_err(INDEX_TEMP_NAME, e))?;
    drop(file);

    dir.rename(INDEX_TEMP_NAME, dir, INDEX_FILE_NAME)
        .map_err(|e| io_err(INDEX_FILE_NAME, e))?;

    index_mtime(dir)
        .map_err(|e| io_err(INDEX_FILE_NAME, e))?
        .ok_or_else(|| {
            io_err(
                INDEX_FILE_NAME,
                io::Error::new(io::ErrorKind::NotFound, "index vanished after write"),
            )
        })
}
