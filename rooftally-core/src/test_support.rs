//! Test doubles for the footprint source, shared by unit and behaviour tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use geo::polygon;

use crate::{Bbox, Footprint, FootprintBatch, FootprintBatches, FootprintSource, SourceError};

/// Side length, in degrees, of footprints built by [`square_footprint`].
pub const SQUARE_SIDE_DEG: f64 = 0.0001;

/// A small square footprint whose south-west corner sits at `(lon, lat)`.
pub fn square_footprint(id: &str, lon: f64, lat: f64) -> Footprint {
    let s = SQUARE_SIDE_DEG;
    Footprint::new(
        id,
        polygon![
            (x: lon, y: lat),
            (x: lon + s, y: lat),
            (x: lon + s, y: lat + s),
            (x: lon, y: lat + s),
            (x: lon, y: lat),
        ],
    )
}

/// In-memory [`FootprintSource`] returning canned batches.
///
/// Footprints outside the requested bbox are dropped from every batch, as a
/// server-side spatial filter would. Calls are counted so tests can assert
/// which resolution tier answered.
#[derive(Debug, Default)]
pub struct StubFootprintSource {
    batches: Vec<FootprintBatch>,
    fail_on_start: Option<SourceError>,
    fail_after_batches: Option<SourceError>,
    calls: AtomicUsize,
}

impl StubFootprintSource {
    /// A source with no footprints anywhere.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A source returning `footprints` as a single batch.
    pub fn with_footprints(footprints: Vec<Footprint>) -> Self {
        Self::with_batches(vec![footprints])
    }

    /// A source returning `batches` in order.
    pub fn with_batches(batches: Vec<FootprintBatch>) -> Self {
        Self {
            batches,
            ..Self::default()
        }
    }

    /// A source whose every fetch fails immediately with `error`.
    pub fn with_error(error: SourceError) -> Self {
        Self {
            fail_on_start: Some(error),
            ..Self::default()
        }
    }

    /// Yield `error` after the configured batches have been delivered.
    #[must_use]
    pub fn then_fail(mut self, error: SourceError) -> Self {
        self.fail_after_batches = Some(error);
        self
    }

    /// Number of `fetch_by_bbox` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FootprintSource for StubFootprintSource {
    fn fetch_by_bbox(&self, bbox: &Bbox) -> Result<FootprintBatches<'_>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.fail_on_start {
            return Err(error.clone());
        }
        let bbox = *bbox;
        let batches = self.batches.iter().map(move |batch| {
            Ok(batch
                .iter()
                .filter(|footprint| overlaps(footprint, &bbox))
                .cloned()
                .collect())
        });
        let tail = self.fail_after_batches.clone().map(Err);
        Ok(Box::new(batches.chain(tail)))
    }
}

fn overlaps(footprint: &Footprint, bbox: &Bbox) -> bool {
    footprint
        .bounding_rect()
        .and_then(|rect| Bbox::try_from(rect).ok())
        .is_some_and(|rect| rect.overlaps(bbox))
}
