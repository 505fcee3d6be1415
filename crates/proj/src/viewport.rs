use crate::mercator::GeoPoint;

/// Caller-supplied description of one rendered surface.
///
/// Recomputed on every render call and never persisted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: f64,
    pub width_px: u32,
    pub height_px: u32,
    pub layer: String,
}

impl Viewport {
    pub fn new(
        center: GeoPoint,
        zoom: f64,
        width_px: u32,
        height_px: u32,
        layer: impl Into<String>,
    ) -> Self {
        Self {
            center,
            zoom,
            width_px,
            height_px,
            layer: layer.into(),
        }
    }
}
