use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Side length of the tile-local coordinate space features are clipped to.
pub const TILE_EXTENT: f64 = 4096.0;

/// One decoded map feature: coordinate rings in tile-local space plus a
/// free-form property bag. Immutable once returned by a decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// First ring is the outer boundary; any further rings are holes.
    /// Coordinates lie in `0..TILE_EXTENT`.
    pub rings: Vec<Vec<[f64; 2]>>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Feature {
    pub fn new(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Self {
            rings,
            properties: BTreeMap::new(),
        }
    }

    /// Outer boundary ring, if the feature has one.
    pub fn outer_ring(&self) -> Option<&[[f64; 2]]> {
        self.rings.first().map(|r| r.as_slice())
    }

    /// Styling hook: the `fillColor` property as a string, when present.
    pub fn fill_color(&self) -> Option<&str> {
        self.properties.get("fillColor").and_then(|v| v.as_str())
    }
}
