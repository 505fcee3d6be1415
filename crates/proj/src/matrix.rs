use crate::mercator::{WorldPixel, world_pixel};
use crate::viewport::Viewport;

/// Affine transform from world-pixel space to normalized device coordinates.
///
/// NDC x runs -1..1 left to right, NDC y runs -1..1 bottom to top; world
/// pixels grow rightwards and downwards, hence the negative y scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionMatrix {
    pub scale_x: f64,
    pub scale_y: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl ProjectionMatrix {
    pub fn from_viewport(viewport: &Viewport) -> Self {
        let center = world_pixel(viewport.center, viewport.zoom);
        let w = viewport.width_px.max(1) as f64;
        let h = viewport.height_px.max(1) as f64;

        Self {
            scale_x: 2.0 / w,
            scale_y: -2.0 / h,
            translate_x: -center.x * 2.0 / w,
            translate_y: center.y * 2.0 / h,
        }
    }

    pub fn apply(&self, wp: WorldPixel) -> (f64, f64) {
        (
            wp.x * self.scale_x + self.translate_x,
            wp.y * self.scale_y + self.translate_y,
        )
    }

    /// Packed (scale.xy, translate.xy) layout for the shader uniform.
    pub fn to_vec4(self) -> [f32; 4] {
        [
            self.scale_x as f32,
            self.scale_y as f32,
            self.translate_x as f32,
            self.translate_y as f32,
        ]
    }
}
