use std::time::Duration;

use serde::{Deserialize, Serialize};
use tiles::CacheLimits;

/// Engine construction knobs. All fields have sensible defaults so an
/// options file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Tile cache time-to-live in seconds.
    pub cache_ttl_secs: u64,
    /// Tile cache entry cap (LRU above this).
    pub cache_max_tiles: usize,
    /// Per-frame clear color (RGBA, 0..1).
    pub clear_color: [f32; 4],
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            cache_max_tiles: 512,
            clear_color: [0.08, 0.09, 0.11, 1.0],
        }
    }
}

impl EngineOptions {
    pub fn cache_limits(&self) -> CacheLimits {
        CacheLimits {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            max_entries: self.cache_max_tiles,
        }
    }
}
