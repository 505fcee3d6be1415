use crate::tile::TileKey;

/// Side length of a map tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Geographic position in degrees (WGS84 lon/lat).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

/// Position on the Web-Mercator world-pixel plane at some zoom.
///
/// The plane is square with side `TILE_SIZE * 2^zoom`; y grows southwards.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldPixel {
    pub x: f64,
    pub y: f64,
}

/// Spherical Web-Mercator forward projection.
///
/// Pure and deterministic; NaN inputs propagate to the output.
pub fn world_pixel(geo: GeoPoint, zoom: f64) -> WorldPixel {
    let scale = TILE_SIZE * zoom.exp2();
    let sin_lat = geo.lat_deg.to_radians().sin();

    let x = (geo.lon_deg + 180.0) / 360.0 * scale;
    let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * std::f64::consts::PI)) * scale;

    WorldPixel { x, y }
}

/// Grid cell containing a world-pixel position.
pub fn containing_tile(wp: WorldPixel) -> (i64, i64) {
    ((wp.x / TILE_SIZE).floor() as i64, (wp.y / TILE_SIZE).floor() as i64)
}

/// Tiles covering the viewport at z = ⌊zoom⌋, in ascending key order.
///
/// The span is the full viewport extent on *each* side of the center tile,
/// i.e. twice what is strictly visible, so neighbouring tiles are already
/// resolved when the view pans. Tiles outside the 0..2^z grid are dropped;
/// there is no wraparound across the antimeridian.
pub fn visible_tiles(center: GeoPoint, zoom: f64, width_px: u32, height_px: u32) -> Vec<TileKey> {
    let z = zoom.floor().clamp(0.0, 30.0) as u8;
    let per_axis = TileKey::tiles_per_axis(z) as i64;

    let (cx, cy) = containing_tile(world_pixel(center, z as f64));
    let span_x = (width_px as f64 / TILE_SIZE).ceil() as i64;
    let span_y = (height_px as f64 / TILE_SIZE).ceil() as i64;

    let mut tiles = Vec::new();
    for x in (cx - span_x)..=(cx + span_x) {
        if x < 0 || x >= per_axis {
            continue;
        }
        for y in (cy - span_y)..=(cy + span_y) {
            if y < 0 || y >= per_axis {
                continue;
            }
            tiles.push(TileKey::new(z, x as u32, y as u32));
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::{GeoPoint, TILE_SIZE, visible_tiles, world_pixel};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn null_island_projects_to_plane_center() {
        let wp = world_pixel(GeoPoint::new(0.0, 0.0), 0.0);
        assert_close(wp.x, TILE_SIZE / 2.0, 1e-9);
        assert_close(wp.y, TILE_SIZE / 2.0, 1e-9);
    }

    #[test]
    fn zoom_step_doubles_world_pixels() {
        let geo = GeoPoint::new(17.1077, 48.1486);
        for z in 0..10 {
            let a = world_pixel(geo, z as f64);
            let b = world_pixel(geo, (z + 1) as f64);
            assert_close(b.x, a.x * 2.0, 1e-6);
            assert_close(b.y, a.y * 2.0, 1e-6);
        }
    }

    #[test]
    fn projection_is_deterministic() {
        let geo = GeoPoint::new(-73.9857, 40.7484);
        assert_eq!(world_pixel(geo, 12.0), world_pixel(geo, 12.0));
    }

    #[test]
    fn visible_tiles_stay_in_grid() {
        // Corner viewport near the antimeridian / pole: no wraparound.
        let tiles = visible_tiles(GeoPoint::new(-179.9, 84.9), 3.0, 1024, 768);
        assert!(!tiles.is_empty());
        for t in &tiles {
            assert_eq!(t.z, 3);
            assert!(t.in_bounds(), "{t} escaped the grid");
        }
    }

    #[test]
    fn visible_tiles_sorted_and_bounded_for_bratislava() {
        let tiles = visible_tiles(GeoPoint::new(17.1077, 48.1486), 10.0, 800, 600);
        assert!(!tiles.is_empty());
        assert!(tiles.len() <= (2 * 4 + 1) * (2 * 3 + 1));
        for t in &tiles {
            assert_eq!(t.z, 10);
            assert!(t.in_bounds());
        }
        let mut sorted = tiles.clone();
        sorted.sort();
        assert_eq!(tiles, sorted);
        // Center tile must be part of the set.
        assert!(tiles.iter().any(|t| t.x == 560 && t.y == 355));
    }

    #[test]
    fn fractional_zoom_culls_at_floor_level() {
        for t in visible_tiles(GeoPoint::new(10.0, 50.0), 7.7, 640, 480) {
            assert_eq!(t.z, 7);
            assert!(t.in_bounds());
        }
    }
}
