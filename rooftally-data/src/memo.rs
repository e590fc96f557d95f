//! Short-lived in-memory memoisation of resolved point-radius queries.
//!
//! Entries are keyed on the query centre rounded to 1e-6 degrees and the
//! radius rounded to 0.1 m. They expire a fixed time after insertion; reading
//! an entry does not extend its life. When full, the entry inserted earliest
//! makes room for the new one.
//!
//! The cache is advisory. Dropping every entry changes latency, never
//! results.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use rooftally_core::Footprint;

/// Default number of live entries.
pub const DEFAULT_CAPACITY: usize = 50;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Sizing for [`MemoQueryCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoConfig {
    /// Most entries held at once.
    pub capacity: usize,
    /// How long an entry stays valid after insertion.
    pub ttl: Duration,
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }
}

impl MemoConfig {
    /// Set the capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the entry lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Quantised query key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoKey {
    lat_e6: i64,
    lon_e6: i64,
    radius_dm: i64,
}

impl MemoKey {
    /// Quantise a query: degrees to 1e-6, metres to 0.1.
    #[must_use]
    pub fn new(lat: f64, lon: f64, radius_m: f64) -> Self {
        Self {
            lat_e6: (lat * 1e6).round() as i64,
            lon_e6: (lon * 1e6).round() as i64,
            radius_dm: (radius_m * 10.0).round() as i64,
        }
    }
}

#[derive(Debug)]
struct MemoEntry {
    footprints: Arc<[Footprint]>,
    inserted: Instant,
}

/// Bounded, TTL-based cache of refined footprint sets.
#[derive(Debug, Default)]
pub struct MemoQueryCache {
    config: MemoConfig,
    entries: Mutex<HashMap<MemoKey, MemoEntry>>,
}

impl MemoQueryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(config: MemoConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> MemoConfig {
        self.config
    }

    /// Cached footprints for the query, if present and not expired.
    pub fn get(&self, lat: f64, lon: f64, radius_m: f64) -> Option<Arc<[Footprint]>> {
        self.get_at(lat, lon, radius_m, Instant::now())
    }

    /// [`Self::get`] evaluated at `now`.
    pub fn get_at(&self, lat: f64, lon: f64, radius_m: f64, now: Instant) -> Option<Arc<[Footprint]>> {
        let key = MemoKey::new(lat, lon, radius_m);
        let mut entries = self.lock();
        let entry = entries.get(&key)?;
        if self.is_live(entry, now) {
            return Some(Arc::clone(&entry.footprints));
        }
        entries.remove(&key);
        None
    }

    /// Store footprints for the query.
    pub fn put(&self, lat: f64, lon: f64, radius_m: f64, footprints: impl Into<Arc<[Footprint]>>) {
        self.put_at(lat, lon, radius_m, footprints, Instant::now());
    }

    /// [`Self::put`] evaluated at `now`.
    ///
    /// Expired entries are purged first. If the cache is still full and the
    /// key is new, the entry with the earliest insertion time is evicted.
    pub fn put_at(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
        footprints: impl Into<Arc<[Footprint]>>,
        now: Instant,
    ) {
        if self.config.capacity == 0 {
            return;
        }
        let key = MemoKey::new(lat, lon, radius_m);
        let mut entries = self.lock();
        entries.retain(|_, entry| self.is_live(entry, now));

        if entries.len() >= self.config.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!("memo cache full; evicted oldest entry");
            }
        }

        entries.insert(
            key,
            MemoEntry {
                footprints: footprints.into(),
                inserted: now,
            },
        );
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn is_live(&self, entry: &MemoEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted) < self.config.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MemoKey, MemoEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
