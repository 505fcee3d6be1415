use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use proj::TileKey;

use crate::feature::Feature;

/// Cache sizing policy: entries older than `ttl` are judged stale lazily on
/// read; `max_entries` bounds memory for long-running sessions via LRU
/// eviction on insert.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheLimits {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_entries: 512,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    features: Arc<[Feature]>,
    layer: String,
    stored_at: Instant,
    last_used_tick: u64,
}

/// Deterministic in-memory tile cache.
///
/// Notes on determinism:
/// - Entries are keyed in a `BTreeMap` for stable traversal order.
/// - Eviction is LRU by `last_used_tick`, with a tie-break by key ordering.
#[derive(Debug)]
pub struct TileCache {
    limits: CacheLimits,
    tick: u64,
    entries: BTreeMap<TileKey, CacheEntry>,
}

impl TileCache {
    pub fn new(limits: CacheLimits) -> Self {
        Self {
            limits,
            tick: 0,
            entries: BTreeMap::new(),
        }
    }

    pub fn limits(&self) -> CacheLimits {
        self.limits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached features for `key`, valid only if the entry was stored for the
    /// same `layer` and is younger than the TTL. A valid hit refreshes the
    /// entry's LRU position; a stale entry is left in place to be
    /// overwritten by the next insert.
    pub fn get(&mut self, key: &TileKey, layer: &str, now: Instant) -> Option<Arc<[Feature]>> {
        self.tick += 1;
        let entry = self.entries.get_mut(key)?;
        if entry.layer != layer {
            return None;
        }
        if now.saturating_duration_since(entry.stored_at) >= self.limits.ttl {
            return None;
        }
        entry.last_used_tick = self.tick;
        Some(Arc::clone(&entry.features))
    }

    /// Store (or overwrite, last write wins) the features for `key` and
    /// evict least-recently-used entries above the cap. Returns the evicted
    /// keys, oldest first.
    pub fn insert(
        &mut self,
        key: TileKey,
        layer: impl Into<String>,
        features: Arc<[Feature]>,
        now: Instant,
    ) -> Vec<TileKey> {
        self.tick += 1;
        self.entries.insert(
            key,
            CacheEntry {
                features,
                layer: layer.into(),
                stored_at: now,
                last_used_tick: self.tick,
            },
        );
        self.evict_as_needed(&key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_as_needed(&mut self, protected: &TileKey) -> Vec<TileKey> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.limits.max_entries.max(1) {
            let candidate = self
                .entries
                .iter()
                .filter(|(k, _)| *k != protected)
                .min_by(|(ka, ea), (kb, eb)| {
                    ea.last_used_tick
                        .cmp(&eb.last_used_tick)
                        .then_with(|| ka.cmp(kb))
                })
                .map(|(k, _)| *k);

            let Some(key) = candidate else {
                break;
            };
            self.entries.remove(&key);
            tracing::debug!(tile = %key, "evicted cached tile over entry cap");
            evicted.push(key);
        }
        evicted
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(CacheLimits::default())
    }
}
