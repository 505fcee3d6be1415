use std::fmt;

/// Tile address in the ZXY scheme.
///
/// Ordered so tile sets traverse and draw in a stable order regardless of
/// how their contents were resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one axis at zoom `z` (2^z).
    pub fn tiles_per_axis(z: u8) -> u32 {
        1u32 << z.min(31)
    }

    /// True iff `x` and `y` lie inside the 0..2^z grid.
    pub fn in_bounds(&self) -> bool {
        let n = Self::tiles_per_axis(self.z);
        self.x < n && self.y < n
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
