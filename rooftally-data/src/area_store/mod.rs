//! Durable, file-backed cache of materialised regions.
//!
//! An [`AreaStore`] owns one directory. The directory holds
//! `cache_index.json`, listing every [`CachedArea`] in insertion order, plus
//! one `<id>.rtfa` footprint file per area. Every mutation rewrites the whole
//! index under the store's lock. Reads compare the index file's modification
//! time with the last one seen and reload when another writer has touched it.

mod data_file;
mod error;
mod index;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::Dir;
use chrono::Utc;
use log::{debug, info, warn};
use rooftally_core::area::bytes_to_mb;
use rooftally_core::region::round_to;
use rooftally_core::{
    AreaId, Bbox, CacheRequest, CachedArea, Footprint, FootprintSource, dedupe_by_id,
    validate_cache_region,
};
use rstar::{AABB, RTree};
use serde::{Deserialize, Serialize};

pub use data_file::{DATA_FILE_EXTENSION, DataFileError, data_file_name};
pub use error::AreaStoreError;
pub use index::{AreaIndex, INDEX_FILE_NAME};

use data_file::{read_data_file, write_data_file};
use index::{index_mtime, read_index, write_index};

/// Fewest footprints assumed when scaling download progress.
const MIN_EXPECTED_ENTITIES: u64 = 500;

/// Receives progress checkpoints while an area is being materialised.
pub trait ProgressSink {
    /// Report `percent` complete with a human-readable phase message.
    fn report(&self, percent: u8, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u8, &str),
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message);
    }
}

/// A [`ProgressSink`] that discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// A cached area together with its footprints.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaDataset {
    /// The index entry, with `last_accessed` already bumped.
    pub area: CachedArea,
    /// Every footprint stored for the area.
    pub footprints: Vec<Footprint>,
}

impl AreaDataset {
    /// Footprints whose bounding rectangle intersects `bbox`, ordered by id.
    #[must_use]
    pub fn into_clipped(self, bbox: &Bbox) -> Vec<Footprint> {
        let tree = RTree::bulk_load(self.footprints);
        let envelope = AABB::from_corners(
            [bbox.min_lon(), bbox.min_lat()],
            [bbox.max_lon(), bbox.max_lat()],
        );
        let mut clipped: Vec<Footprint> = tree
            .locate_in_envelope_intersecting(&envelope)
            .cloned()
            .collect();
        clipped.sort_by(|a, b| a.id.cmp(&b.id));
        clipped
    }
}

/// Aggregate figures over every cached area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of index entries.
    pub total_areas: usize,
    /// Sum of `entity_count` over all entries.
    pub total_entities: usize,
    /// Sum of data file sizes.
    pub total_size_bytes: u64,
    /// Sum of data file sizes in mebibytes, rounded to two decimals.
    pub total_size_mb: f64,
}

struct IndexState {
    areas: Vec<CachedArea>,
    loaded_mtime: Option<SystemTime>,
}

/// Durable registry of materialised regions rooted at one directory.
///
/// # Examples
/// ```no_run
/// use rooftally_data::AreaStore;
///
/// # fn main() -> Result<(), rooftally_data::AreaStoreError> {
/// let store = AreaStore::open("building_cache")?;
/// for area in store.list() {
///     println!("{} {} ({} footprints)", area.id, area.name, area.entity_count);
/// }
/// # Ok(())
/// # }
/// ```
pub struct AreaStore {
    root: Utf8PathBuf,
    dir: Dir,
    state: Mutex<IndexState>,
}

impl std::fmt::Debug for AreaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl AreaStore {
    /// Open the store at `root`, creating the directory when missing.
    ///
    /// An unreadable index is logged and treated as empty; it is replaced on
    /// the next mutation.
    pub fn open(root: impl AsRef<Utf8Path>) -> Result<Self, AreaStoreError> {
        let root = root.as_ref().to_path_buf();
        let dir = rooftally_fs::open_or_create_dir(&root).map_err(|source| AreaStoreError::Io {
            path: root.clone(),
            source,
        })?;

        let loaded_mtime = index_mtime(&dir).map_err(|source| AreaStoreError::Io {
            path: INDEX_FILE_NAME.into(),
            source,
        })?;
        let areas = match read_index(&dir) {
            Ok(index) => index.map(|index| index.areas).unwrap_or_default(),
            Err(err) => {
                warn!("ignoring unreadable area index in {root}: {err}");
                Vec::new()
            }
        };
        debug!("opened area store at {root} with {} areas", areas.len());

        Ok(Self {
            root,
            dir,
            state: Mutex::new(IndexState {
                areas,
                loaded_mtime,
            }),
        })
    }

    /// Directory the store was opened on.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Snapshot of every cached area, in insertion order.
    pub fn list(&self) -> Vec<CachedArea> {
        let mut state = self.lock();
        self.reconcile(&mut state);
        state.areas.clone()
    }

    /// The index entry for `id`, if any.
    pub fn get(&self, id: &AreaId) -> Option<CachedArea> {
        self.list().into_iter().find(|area| &area.id == id)
    }

    /// The earliest-indexed area whose bbox fully contains `bbox`.
    pub fn find_covering(&self, bbox: &Bbox) -> Option<CachedArea> {
        self.list().into_iter().find(|area| area.bbox.covers(bbox))
    }

    /// Every area whose bbox shares at least one point with `bbox`.
    pub fn find_overlapping(&self, bbox: &Bbox) -> Vec<CachedArea> {
        self.list()
            .into_iter()
            .filter(|area| area.bbox.overlaps(bbox))
            .collect()
    }

    /// Load the footprints of area `id` and record the access.
    ///
    /// Returns `Ok(None)` for an unknown id or a dangling entry whose file is
    /// missing; dangling entries are logged but left in the index. A file
    /// that exists but cannot be decoded is [`AreaStoreError::CorruptEntry`].
    pub fn load(&self, id: &AreaId) -> Result<Option<AreaDataset>, AreaStoreError> {
        let Some(area) = self.get(id) else {
            return Ok(None);
        };
        if !self.has_data_file(&area)? {
            warn!(
                "cached area {} references missing data file {}",
                area.id, area.file_path
            );
            return Ok(None);
        }

        let footprints =
            read_data_file(&self.dir, &area.file_path).map_err(|source| {
                AreaStoreError::CorruptEntry {
                    id: area.id.clone(),
                    source,
                }
            })?;

        let area = self.touch(area);
        Ok(Some(AreaDataset { area, footprints }))
    }

    /// Download `request.bbox` from `source` and register it as a new area.
    ///
    /// Progress checkpoints go to `progress`. Returns `Ok(None)` without
    /// touching the index when the source has no footprints for the region.
    pub fn add<P>(
        &self,
        request: &CacheRequest,
        source: &dyn FootprintSource,
        progress: &P,
    ) -> Result<Option<CachedArea>, AreaStoreError>
    where
        P: ProgressSink + ?Sized,
    {
        let estimate = validate_cache_region(&request.bbox)?;
        let expected = estimate.estimated_entities.max(MIN_EXPECTED_ENTITIES);

        progress.report(2, "Connecting to footprint source...");
        let batches = source.fetch_by_bbox(&request.bbox)?;
        progress.report(5, "Downloading building footprints...");

        let mut downloaded = Vec::new();
        for batch in batches {
            downloaded.extend(batch?);
            progress.report(
                download_percent(downloaded.len(), expected),
                &format!("Downloaded {} buildings...", downloaded.len()),
            );
        }

        if downloaded.is_empty() {
            progress.report(100, "No buildings found in this area.");
            return Ok(None);
        }

        progress.report(72, &format!("Merging {} records...", downloaded.len()));
        let footprints = dedupe_by_id(downloaded);

        progress.report(75, "Converting geometry...");
        let id = AreaId::generate();
        let file_path = data_file_name(&id);

        progress.report(85, "Saving to disk...");
        let file_size_bytes =
            write_data_file(&self.dir, &file_path, &footprints).map_err(|source| {
                AreaStoreError::WriteData {
                    id: id.clone(),
                    source,
                }
            })?;

        let now = Utc::now();
        let area = CachedArea {
            id,
            name: request.name.clone(),
            bbox: request.bbox,
            center_lon: request.center.x,
            center_lat: request.center.y,
            radius_km: request.radius_km,
            area_km2: estimate.area_km2,
            entity_count: footprints.len(),
            file_size_bytes,
            file_path,
            created_at: now,
            last_accessed: now,
        };

        {
            let mut state = self.lock();
            self.reconcile(&mut state);
            state.areas.push(area.clone());
            if let Err(err) = self.persist(&mut state) {
                state.areas.retain(|a| a.id != area.id);
                drop(state);
                self.remove_data_file(&area);
                return Err(err);
            }
        }
        info!(
            "cached area {} ({}) with {} footprints",
            area.id, area.name, area.entity_count
        );

        progress.report(
            100,
            &format!(
                "Cached {} buildings ({:.1} MB)",
                area.entity_count,
                area.file_size_mb()
            ),
        );
        Ok(Some(area))
    }

    /// Remove area `id` and its data file. Returns whether the entry existed.
    ///
    /// The shrunken index is written before the data file is unlinked; when
    /// that write fails the entry and its file are left in place. A data file
    /// that is already gone is not an error.
    pub fn delete(&self, id: &AreaId) -> Result<bool, AreaStoreError> {
        let mut state = self.lock();
        self.reconcile(&mut state);
        let Some(position) = state.areas.iter().position(|area| &area.id == id) else {
            return Ok(false);
        };
        let area = state.areas.remove(position);
        if let Err(err) = self.persist(&mut state) {
            state.areas.insert(position, area);
            return Err(err);
        }
        self.remove_data_file(&area);
        info!("deleted cached area {} ({})", area.id, area.name);
        Ok(true)
    }

    /// Remove every area and data file, returning how many entries existed.
    ///
    /// Data files are unlinked only once the empty index is on disk.
    pub fn clear(&self) -> Result<usize, AreaStoreError> {
        let mut state = self.lock();
        self.reconcile(&mut state);
        let removed = std::mem::take(&mut state.areas);
        if let Err(err) = self.persist(&mut state) {
            state.areas = removed;
            return Err(err);
        }
        for area in &removed {
            self.remove_data_file(area);
        }
        if !removed.is_empty() {
            info!("cleared {} cached areas", removed.len());
        }
        Ok(removed.len())
    }

    /// Totals over every cached area.
    pub fn stats(&self) -> StoreStats {
        let areas = self.list();
        let total_size_bytes = areas.iter().map(|a| a.file_size_bytes).sum();
        StoreStats {
            total_areas: areas.len(),
            total_entities: areas.iter().map(|a| a.entity_count).sum(),
            total_size_bytes,
            total_size_mb: round_to(bytes_to_mb(total_size_bytes), 2),
        }
    }

    /// Entries whose data file is missing or not a regular file.
    pub fn dangling(&self) -> Vec<CachedArea> {
        self.list()
            .into_iter()
            .filter(|area| !self.has_data_file(area).unwrap_or(true))
            .collect()
    }

    /// Drop every dangling entry from the index, returning how many went.
    pub fn prune_dangling(&self) -> Result<usize, AreaStoreError> {
        let mut state = self.lock();
        self.reconcile(&mut state);
        let previous = std::mem::take(&mut state.areas);
        let mut kept = Vec::with_capacity(previous.len());
        for area in &previous {
            if self.has_data_file(area).unwrap_or(true) {
                kept.push(area.clone());
            } else {
                info!("pruning dangling area {} ({})", area.id, area.name);
            }
        }
        let pruned = previous.len() - kept.len();
        state.areas = kept;
        if pruned > 0
            && let Err(err) = self.persist(&mut state)
        {
            state.areas = previous;
            return Err(err);
        }
        Ok(pruned)
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reload the index when its file is newer than the copy in memory.
    ///
    /// A failed reload keeps the previous view; the new modification time is
    /// still recorded so the broken file is not re-read on every call.
    fn reconcile(&self, state: &mut IndexState) {
        let disk_mtime = match index_mtime(&self.dir) {
            Ok(Some(mtime)) => mtime,
            Ok(None) => {
                if state.loaded_mtime.take().is_some() {
                    debug!(
                        "area index in {} was removed; dropping {} areas",
                        self.root,
                        state.areas.len()
                    );
                    state.areas.clear();
                }
                return;
            }
            Err(err) => {
                warn!("cannot stat area index in {}: {err}", self.root);
                return;
            }
        };
        if state.loaded_mtime.is_some_and(|loaded| disk_mtime <= loaded) {
            return;
        }
        match read_index(&self.dir) {
            Ok(index) => {
                state.areas = index.map(|index| index.areas).unwrap_or_default();
                debug!(
                    "reloaded area index in {} ({} areas)",
                    self.root,
                    state.areas.len()
                );
            }
            Err(err) => warn!("keeping previous area index for {}: {err}", self.root),
        }
        state.loaded_mtime = Some(disk_mtime);
    }

    fn persist(&self, state: &mut IndexState) -> Result<(), AreaStoreError> {
        let index = AreaIndex::new(state.areas.clone());
        state.loaded_mtime = Some(write_index(&self.dir, &index)?);
        Ok(())
    }

    /// Bump `last_accessed` for `area`, returning the updated record.
    ///
    /// A failed index write is logged; the caller still gets its data.
    fn touch(&self, mut area: CachedArea) -> CachedArea {
        let now = Utc::now();
        let mut state = self.lock();
        self.reconcile(&mut state);
        if let Some(entry) = state.areas.iter_mut().find(|a| a.id == area.id) {
            entry.last_accessed = now;
            area = entry.clone();
            if let Err(err) = self.persist(&mut state) {
                warn!("failed to record access to area {}: {err}", area.id);
            }
        }
        area
    }

    fn has_data_file(&self, area: &CachedArea) -> Result<bool, AreaStoreError> {
        if !rooftally_fs::is_plain_file_name(&area.file_path) {
            return Ok(false);
        }
        rooftally_fs::is_regular_file(&self.dir, &area.file_path).map_err(|source| {
            AreaStoreError::Io {
                path: area.file_path.clone(),
                source,
            }
        })
    }

    fn remove_data_file(&self, area: &CachedArea) {
        if !rooftally_fs::is_plain_file_name(&area.file_path) {
            warn!(
                "not removing {} for area {}: outside the store root",
                area.file_path, area.id
            );
            return;
        }
        if let Err(err) = rooftally_fs::remove_file_if_exists(&self.dir, &area.file_path) {
            warn!(
                "failed to remove data file {} for area {}: {err}",
                area.file_path, area.id
            );
        }
    }
}

fn download_percent(downloaded: usize, expected: u64) -> u8 {
    let scaled = 65 * downloaded as u64 / expected.max(1);
    (5 + scaled).min(70) as u8
}

#[cfg(test)]
impl AreaStore {
    /// Replace the data file of `area` with `footprints`.
    pub(crate) fn overwrite_data_file(
        &self,
        area: &CachedArea,
        footprints: &[Footprint],
    ) -> Result<u64, DataFileError> {
        write_data_file(&self.dir, &area.file_path, footprints)
    }
}
