use tiles::{Feature, TILE_EXTENT};

use crate::color::fill_color_or_default;
use crate::device::RenderDevice;
use crate::program::ShaderProgram;

/// Draw one feature into the current frame.
///
/// The outer ring is scaled from tile-local space (0..extent) into
/// world-pixel space and drawn as a triangle fan through the shared vertex
/// buffer. The fan is a convex fill approximation; non-convex rings render
/// incorrectly, which is acceptable for the boundary/area data this engine
/// serves. Returns false for degenerate geometry (fewer than 3 points),
/// which is skipped silently rather than treated as an error.
pub fn render_feature<D: RenderDevice>(
    device: &mut D,
    program: &ShaderProgram<D>,
    feature: &Feature,
    tile_origin_px: (f64, f64),
    tile_size_px: f64,
) -> bool {
    let Some(ring) = feature.outer_ring() else {
        return false;
    };
    if ring.len() < 3 {
        return false;
    }

    let mut xy = Vec::with_capacity(ring.len() * 2);
    for [local_x, local_y] in ring {
        xy.push((tile_origin_px.0 + local_x / TILE_EXTENT * tile_size_px) as f32);
        xy.push((tile_origin_px.1 + local_y / TILE_EXTENT * tile_size_px) as f32);
    }

    device.upload_vertices(program.vertex_buffer, &xy);
    device.set_uniform_vec4(
        program.u_fill_color,
        fill_color_or_default(feature.fill_color()),
    );
    device.draw_triangle_fan(
        program.program,
        program.vertex_buffer,
        program.a_position,
        ring.len() as u32,
    );
    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tiles::Feature;

    use super::render_feature;
    use crate::color::DEFAULT_FILL;
    use crate::program::ShaderProgram;
    use crate::recording::{Event, RecordingDevice};

    fn triangle() -> Feature {
        Feature::new(vec![vec![[0.0, 0.0], [4096.0, 0.0], [4096.0, 4096.0]]])
    }

    #[test]
    fn transforms_into_world_pixels() {
        let mut device = RecordingDevice::new();
        let program = ShaderProgram::new(&mut device).expect("program");

        assert!(render_feature(
            &mut device,
            &program,
            &triangle(),
            (143360.0, 90880.0),
            256.0,
        ));

        let uploaded = device.last_upload().expect("upload");
        // (0,0) -> tile origin; (4096,4096) -> opposite corner.
        assert_eq!(&uploaded[0..2], &[143360.0, 90880.0]);
        assert_eq!(&uploaded[4..6], &[143360.0 + 256.0, 90880.0 + 256.0]);
        assert_eq!(device.draw_count(), 1);
    }

    #[test]
    fn degenerate_geometry_is_skipped_silently() {
        let mut device = RecordingDevice::new();
        let program = ShaderProgram::new(&mut device).expect("program");

        let two_points = Feature::new(vec![vec![[0.0, 0.0], [10.0, 10.0]]]);
        assert!(!render_feature(&mut device, &program, &two_points, (0.0, 0.0), 256.0));

        let no_rings = Feature::new(Vec::new());
        assert!(!render_feature(&mut device, &program, &no_rings, (0.0, 0.0), 256.0));

        assert_eq!(device.draw_count(), 0);
    }

    #[test]
    fn fill_color_falls_back_to_default() {
        let mut device = RecordingDevice::new();
        let program = ShaderProgram::new(&mut device).expect("program");

        render_feature(&mut device, &program, &triangle(), (0.0, 0.0), 256.0);

        let mut styled = triangle();
        styled
            .properties
            .insert("fillColor".to_string(), json!("#ff0000"));
        render_feature(&mut device, &program, &styled, (0.0, 0.0), 256.0);

        let colors: Vec<[f32; 4]> = device
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Uniform { handle, value } if *handle == program.u_fill_color => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0], DEFAULT_FILL);
        assert_eq!(colors[1], [1.0, 0.0, 0.0, 1.0]);
    }
}
