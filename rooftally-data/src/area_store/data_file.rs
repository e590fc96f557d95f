//! Per-area footprint files.
//!
//! Each cached area stores its footprints in `<id>.rtfa` directly under the
//! store root: a four byte `RTFA` magic, a little-endian `u16` format version,
//! then a `bincode` sequence of [`Footprint`] records.

use std::io::{BufReader, BufWriter, Read, Write};

use bincode::{deserialize_from, serialize_into};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::Dir;
use rooftally_core::{AreaId, Footprint};
use serde::Serialize;
use thiserror::Error;

/// File identifier for area data files.
pub(crate) const DATA_FILE_MAGIC: [u8; 4] = *b"RTFA";

/// Supported version of the data file format.
pub(crate) const DATA_FILE_VERSION: u16 = 1;

/// Extension of area data files.
pub const DATA_FILE_EXTENSION: &str = "rtfa";

/// Header and payload as laid out on disk.
#[derive(Serialize)]
struct DataFileRef<'a> {
    magic: [u8; 4],
    version: u16,
    footprints: &'a [Footprint],
}

/// Errors raised while reading or writing an area data file.
#[derive(Debug, Error)]
pub enum DataFileError {
    /// The file could not be opened, read or written.
    #[error("failed to access area data file {path}: {source}")]
    Io {
        /// File location relative to the store root.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The payload could not be decoded.
    #[error("failed to decode area data file {path}: {source}")]
    Decode {
        /// File location relative to the store root.
        path: Utf8PathBuf,
        /// Decoder error returned by `bincode`.
        #[source]
        source: bincode::Error,
    },
    /// The payload could not be encoded.
    #[error("failed to encode area data file {path}: {source}")]
    Encode {
        /// File location relative to the store root.
        path: Utf8PathBuf,
        /// Encoder error returned by `bincode`.
        #[source]
        source: bincode::Error,
    },
    /// The file did not start with the expected magic bytes.
    #[error("invalid area data magic in {path}: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        /// File location relative to the store root.
        path: Utf8PathBuf,
        /// Expected byte sequence.
        expected: [u8; 4],
        /// Sequence read from the file.
        found: [u8; 4],
    },
    /// The header carried an unknown format version.
    #[error("unsupported area data version {found} in {path}; supported version is {supported}")]
    UnsupportedVersion {
        /// File location relative to the store root.
        path: Utf8PathBuf,
        /// Version present in the header.
        found: u16,
        /// Version this build understands.
        supported: u16,
    },
}

/// File name used for the data of area `id`.
pub fn data_file_name(id: &AreaId) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{id}.{DATA_FILE_EXTENSION}"))
}

/// Write `footprints` to `path` inside `dir`, returning the file size.
///
/// The bytes go to a sibling temporary file that is synced and renamed into
/// place, so a crash never leaves a truncated data file under the final name.
pub(crate) fn write_data_file(
    dir: &Dir,
    path: &Utf8Path,
    footprints: &[Footprint],
) -> Result<u64, DataFileError> {
    let io_err = |source: std::io::Error| DataFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let temp = Utf8PathBuf::from(format!("{path}.tmp"));

    let file = dir.create(&temp).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    let payload = DataFileRef {
        magic: DATA_FILE_MAGIC,
        version: DATA_FILE_VERSION,
        footprints,
    };
    serialize_into(&mut writer, &payload).map_err(|source| DataFileError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    let file = writer
        .into_inner()
        .map_err(|err| io_err(err.into_error()))?;
    file.sync_all().map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();
    drop(file);

    dir.rename(&temp, dir, path).map_err(io_err)?;
    Ok(size)
}

/// Load the footprints stored at `path` inside `dir`.
pub(crate) fn read_data_file(dir: &Dir, path: &Utf8Path) -> Result<Vec<Footprint>, DataFileError> {
    let io_err = |source: std::io::Error| DataFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = dir.open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0_u8; 4];
    reader.read_exact(&mut magic).map_err(io_err)?;
    if magic != DATA_FILE_MAGIC {
        return Err(DataFileError::InvalidMagic {
            path: path.to_path_buf(),
            expected: DATA_FILE_MAGIC,
            found: magic,
        });
    }

    let mut version_bytes = [0_u8; 2];
    reader.read_exact(&mut version_bytes).map_err(io_err)?;
    let version = u16::from_le_bytes(version_bytes);
    if version != DATA_FILE_VERSION {
        return Err(DataFileError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: version,
            supported: DATA_FILE_VERSION,
        });
    }

    deserialize_from(&mut reader).map_err(|source| DataFileError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
