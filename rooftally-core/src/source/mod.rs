//! Fetch building footprints from a remote, partitioned dataset.
//!
//! The [`FootprintSource`] trait abstracts the remote collaborator. A fetch
//! yields footprints in batches so callers can report progress while the
//! download is still running. Transport and decoding failures surface as
//! [`SourceError`]; an empty region is an empty iterator, never an error.

mod error;
mod provider;

pub use error::SourceError;
pub use provider::{FootprintBatch, FootprintBatches, FootprintSource};
