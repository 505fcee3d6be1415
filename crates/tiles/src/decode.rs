use std::fmt;

use crate::feature::Feature;

/// Decode failure for one tile payload. Always treated as recoverable by
/// the loader: the tile degrades to an empty feature list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub reason: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile decode failed: {}", self.reason)
    }
}

impl std::error::Error for DecodeError {}

/// Boundary to the vector-tile binary format.
///
/// The production decoder lives outside this workspace; anything that turns
/// raw bytes into features in `0..TILE_EXTENT` tile-local space fits here.
pub trait TileDecoder: Send + Sync + 'static {
    fn decode(&self, bytes: &[u8], zoom: u8) -> Result<Vec<Feature>, DecodeError>;
}

/// Reference decoder over a JSON feature array, used by tests and the
/// headless tool. The wire shape is `[{"rings": [...], "properties": {...}}]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTileDecoder;

impl TileDecoder for JsonTileDecoder {
    fn decode(&self, bytes: &[u8], _zoom: u8) -> Result<Vec<Feature>, DecodeError> {
        serde_json::from_slice::<Vec<Feature>>(bytes).map_err(|e| DecodeError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonTileDecoder, TileDecoder};

    #[test]
    fn decodes_feature_array() {
        let payload = br##"[
            {"rings": [[[0, 0], [4096, 0], [4096, 4096]]], "properties": {"fillColor": "#123456"}},
            {"rings": [[[1, 2], [3, 4], [5, 6]]]}
        ]"##;
        let features = JsonTileDecoder.decode(payload, 10).expect("decode");
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].fill_color(), Some("#123456"));
        assert!(features[1].properties.is_empty());
    }

    #[test]
    fn malformed_bytes_fail() {
        assert!(JsonTileDecoder.decode(b"\x1f\x8b not json", 3).is_err());
    }
}
