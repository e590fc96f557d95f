//! Footprint source trait and batch aliases.

use crate::{Bbox, Footprint};

use super::error::SourceError;

/// Footprints delivered together, typically one remote partition.
pub type FootprintBatch = Vec<Footprint>;

/// Lazily fetched batches. Iterating drives the remote reads.
pub type FootprintBatches<'a> =
    Box<dyn Iterator<Item = Result<FootprintBatch, SourceError>> + Send + 'a>;

/// Fetch the footprints intersecting a bounding box.
///
/// Implementations are expected to prune server-side so each batch only holds
/// footprints whose geometry touches `bbox`. A batch error ends the fetch;
/// callers stop iterating at the first `Err`.
///
/// # Examples
///
/// ```rust
/// use rooftally_core::{Bbox, Footprint, FootprintBatches, FootprintSource, SourceError};
///
/// struct Nothing;
///
/// impl FootprintSource for Nothing {
///     fn fetch_by_bbox(&self, _bbox: &Bbox) -> Result<FootprintBatches<'_>, SourceError> {
///         Ok(Box::new(std::iter::empty()))
///     }
/// }
///
/// let bbox = Bbox::new(-95.82, 36.05, -95.81, 36.07).expect("bbox");
/// let all = Nothing.fetch_all(&bbox)?;
/// assert!(all.is_empty());
/// # Ok::<(), SourceError>(())
/// ```
pub trait FootprintSource: Send + Sync {
    /// Start fetching `bbox`, returning an iterator over batches.
    fn fetch_by_bbox(&self, bbox: &Bbox) -> Result<FootprintBatches<'_>, SourceError>;

    /// Drain every batch for `bbox` into one vector.
    fn fetch_all(&self, bbox: &Bbox) -> Result<Vec<Footprint>, SourceError> {
        let mut footprints = Vec::new();
        for batch in self.fetch_by_bbox(bbox)? {
            footprints.extend(batch?);
        }
        Ok(footprints)
    }
}
