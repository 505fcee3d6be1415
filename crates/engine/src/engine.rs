use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::join_all;
use proj::{ProjectionMatrix, TILE_SIZE, Viewport, visible_tiles};
use render::{RenderDevice, RenderError, ShaderProgram, render_feature};
use tiles::{TileDecoder, TileLoader, TileSource};
use tracing::debug;

use crate::options::EngineOptions;

/// Contract violations on the engine surface. Per-tile trouble never shows
/// up here; it degrades to blank tiles inside the loader.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine was disposed; no further calls are valid.
    Disposed,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Disposed => write!(f, "engine already disposed"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Per-frame accounting returned by `render`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub generation: u64,
    pub tiles_requested: usize,
    pub features_drawn: usize,
    /// True when a newer render superseded this one while its tiles were
    /// resolving; the resolved results were discarded, nothing was drawn.
    pub stale: bool,
}

/// The tile-map rendering engine: owns one GPU program + vertex buffer, one
/// tile loader/cache, and drives the per-frame sequence.
///
/// Construction performs all GPU setup and fails fast; `render` is
/// best-effort and never fails for tile-level issues; `dispose` is terminal.
pub struct MapEngine<D: RenderDevice, S: TileSource, C: TileDecoder> {
    device: D,
    program: ShaderProgram<D>,
    loader: Arc<TileLoader<S, C>>,
    options: EngineOptions,
    // Shared so a newer render can supersede one whose tiles are still
    // resolving, even when the engine is driven through a shared handle.
    generation: Arc<AtomicU64>,
    disposed: bool,
}

impl<D: RenderDevice, S: TileSource, C: TileDecoder> MapEngine<D, S, C> {
    pub fn new(
        mut device: D,
        source: S,
        decoder: C,
        options: EngineOptions,
    ) -> Result<Self, RenderError> {
        let program = ShaderProgram::new(&mut device)?;
        let loader = Arc::new(TileLoader::new(source, decoder, options.cache_limits()));
        Ok(Self {
            device,
            program,
            loader,
            options,
            generation: Arc::new(AtomicU64::new(0)),
            disposed: false,
        })
    }

    pub fn cached_tiles(&self) -> usize {
        self.loader.cached_tiles()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Backing device, e.g. for pixel read-back on headless targets.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Render one frame for `viewport`: clear, set the projection, resolve
    /// all visible tiles concurrently, then draw them in ascending tile-key
    /// order (never in resolution-completion order). Missing tiles appear
    /// as gaps; `render` only fails on use-after-dispose.
    pub async fn render(&mut self, viewport: &Viewport) -> Result<FrameStats, EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut stats = FrameStats {
            generation,
            ..FrameStats::default()
        };

        self.device.begin_frame(self.options.clear_color);

        let matrix = ProjectionMatrix::from_viewport(viewport);
        self.device
            .set_uniform_vec4(self.program.u_transform, matrix.to_vec4());

        let tile_keys = visible_tiles(
            viewport.center,
            viewport.zoom,
            viewport.width_px,
            viewport.height_px,
        );
        stats.tiles_requested = tile_keys.len();

        let resolved = join_all(tile_keys.iter().map(|key| {
            let loader = Arc::clone(&self.loader);
            let layer = viewport.layer.clone();
            let key = *key;
            async move { loader.resolve(key, &layer).await }
        }))
        .await;

        if self.generation.load(Ordering::SeqCst) != generation {
            stats.stale = true;
            self.device.end_frame();
            debug!(generation, "frame superseded while resolving, discarded");
            return Ok(stats);
        }

        // At fractional zoom the tile grid lives at ⌊zoom⌋ while the matrix
        // lives at `zoom`, so tile origins scale by 2^(zoom − ⌊zoom⌋).
        let tile_size_px = TILE_SIZE * (viewport.zoom - viewport.zoom.floor()).exp2();

        for (key, features) in tile_keys.iter().zip(&resolved) {
            let origin_px = (key.x as f64 * tile_size_px, key.y as f64 * tile_size_px);
            for feature in features.iter() {
                if render_feature(&mut self.device, &self.program, feature, origin_px, tile_size_px)
                {
                    stats.features_drawn += 1;
                }
            }
        }

        self.device.end_frame();
        debug!(
            generation,
            tiles = stats.tiles_requested,
            features = stats.features_drawn,
            layer = %viewport.layer,
            "frame rendered"
        );
        Ok(stats)
    }

    pub fn resize(&mut self, width_px: u32, height_px: u32) {
        if self.disposed {
            return;
        }
        self.device.resize(width_px, height_px);
    }

    /// Free the GPU buffer and program and clear the tile cache. Terminal
    /// and idempotent; any later `render` reports `EngineError::Disposed`.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.program.dispose(&mut self.device);
        self.loader.clear_cache();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock};
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use proj::{GeoPoint, TileKey, Viewport, visible_tiles};
    use render::recording::{Event, FailPoint, RecordingDevice};
    use render::{DEFAULT_FILL, RenderError};
    use tiles::{FetchError, JsonTileDecoder, TileSource};

    use super::{EngineError, MapEngine};
    use crate::options::EngineOptions;

    const TRIANGLE_TILE: &[u8] =
        br#"[{"rings": [[[0, 0], [4096, 0], [4096, 4096]]], "properties": {}}]"#;

    #[derive(Clone)]
    struct StubSource {
        payload: Result<Vec<u8>, FetchError>,
        fetches: Arc<AtomicUsize>,
        /// Non-zero: the i-th fetch sleeps `(64 - i) * delay_step`, so
        /// requests complete in the reverse of the order they were issued.
        delay_step: Duration,
        /// When set, every fetch bumps this counter, superseding whichever
        /// render is currently resolving tiles.
        supersede: Arc<OnceLock<Arc<AtomicU64>>>,
    }

    impl StubSource {
        fn ok(payload: &[u8]) -> Self {
            Self {
                payload: Ok(payload.to_vec()),
                fetches: Arc::new(AtomicUsize::new(0)),
                delay_step: Duration::ZERO,
                supersede: Arc::new(OnceLock::new()),
            }
        }

        fn failing() -> Self {
            Self {
                payload: Err(FetchError::Status(500)),
                ..Self::ok(&[])
            }
        }
    }

    impl TileSource for StubSource {
        async fn fetch(&self, _key: TileKey, _layer: &str) -> Result<Vec<u8>, FetchError> {
            let seq = self.fetches.fetch_add(1, Ordering::SeqCst) as u32;
            if let Some(generation) = self.supersede.get() {
                generation.fetch_add(1, Ordering::SeqCst);
            }
            if !self.delay_step.is_zero() {
                tokio::time::sleep(self.delay_step * (64 - seq.min(63))).await;
            }
            self.payload.clone()
        }
    }

    fn bratislava() -> Viewport {
        Viewport::new(GeoPoint::new(17.1077, 48.1486), 10.0, 800, 600, "boundaries")
    }

    fn engine(
        source: StubSource,
    ) -> MapEngine<RecordingDevice, StubSource, JsonTileDecoder> {
        MapEngine::new(
            RecordingDevice::new(),
            source,
            JsonTileDecoder,
            EngineOptions::default(),
        )
        .expect("engine")
    }

    #[test]
    fn construction_fails_fast_on_gpu_errors() {
        let result = MapEngine::new(
            RecordingDevice::failing(FailPoint::Compile),
            StubSource::ok(TRIANGLE_TILE),
            JsonTileDecoder,
            EngineOptions::default(),
        );
        assert!(matches!(result, Err(RenderError::ShaderCompile { .. })));
    }

    #[tokio::test]
    async fn first_render_fetches_second_hits_cache() {
        let source = StubSource::ok(TRIANGLE_TILE);
        let fetches = Arc::clone(&source.fetches);
        let mut engine = engine(source);
        let viewport = bratislava();

        let stats = engine.render(&viewport).await.expect("render");
        assert!(stats.tiles_requested > 0);
        assert_eq!(fetches.load(Ordering::SeqCst), stats.tiles_requested);
        assert_eq!(stats.features_drawn, stats.tiles_requested);

        // Same viewport within the TTL: zero new fetches.
        let again = engine.render(&viewport).await.expect("render");
        assert_eq!(fetches.load(Ordering::SeqCst), stats.tiles_requested);
        assert_eq!(again.features_drawn, stats.features_drawn);
    }

    #[tokio::test]
    async fn tiles_draw_in_key_order_even_when_resolution_order_inverts() {
        let mut source = StubSource::ok(TRIANGLE_TILE);
        // Stagger the fetches so the first-requested tile resolves last.
        source.delay_step = Duration::from_millis(1);
        let mut engine = engine(source);
        let viewport = bratislava();
        engine.render(&viewport).await.expect("render");

        let expected: Vec<f32> = visible_tiles(
            viewport.center,
            viewport.zoom,
            viewport.width_px,
            viewport.height_px,
        )
        .iter()
        .map(|k| k.x as f32 * 256.0)
        .collect();

        let drawn: Vec<f32> = engine
            .device()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Upload { xy, .. } => Some(xy[0]),
                _ => None,
            })
            .collect();
        assert_eq!(drawn, expected);
    }

    #[tokio::test]
    async fn frame_brackets_and_transform_are_set() {
        let mut engine = engine(StubSource::ok(TRIANGLE_TILE));
        engine.render(&bratislava()).await.expect("render");

        let events = &engine.device().events;
        let begin = events
            .iter()
            .position(|e| matches!(e, Event::BeginFrame(_)))
            .expect("begin");
        let end = events
            .iter()
            .rposition(|e| matches!(e, Event::EndFrame))
            .expect("end");
        let first_draw = events
            .iter()
            .position(|e| matches!(e, Event::DrawFan { .. }))
            .expect("draw");
        assert!(begin < first_draw && first_draw < end);

        // The transform uniform is set before any draw and is not the fill.
        let transform_set = events
            .iter()
            .position(|e| matches!(e, Event::Uniform { value, .. } if *value != DEFAULT_FILL))
            .expect("transform");
        assert!(transform_set < first_draw);
    }

    #[tokio::test]
    async fn superseded_render_discards_resolved_tiles() {
        let source = StubSource::ok(TRIANGLE_TILE);
        let supersede = Arc::clone(&source.supersede);
        let mut engine = engine(source);
        supersede
            .set(Arc::clone(&engine.generation))
            .expect("install supersede hook");

        // Every tile fetch bumps the generation, so by the time the tiles
        // have resolved this render is no longer the newest one.
        let stats = engine.render(&bratislava()).await.expect("render");
        assert!(stats.stale);
        assert_eq!(stats.features_drawn, 0);

        let events = &engine.device().events;
        assert!(!events.iter().any(|e| matches!(e, Event::DrawFan { .. })));
        assert!(events.iter().any(|e| matches!(e, Event::EndFrame)));

        // The resolved tiles were cached, so an uncontested render serves
        // them without fetching and draws normally.
        let again = engine.render(&bratislava()).await.expect("render");
        assert!(!again.stale);
        assert_eq!(again.features_drawn, again.tiles_requested);
    }

    #[tokio::test]
    async fn render_survives_failing_tiles() {
        let mut engine = engine(StubSource::failing());
        let stats = engine.render(&bratislava()).await.expect("render");
        assert!(stats.tiles_requested > 0);
        assert_eq!(stats.features_drawn, 0);
        assert_eq!(engine.cached_tiles(), 0);
    }

    #[tokio::test]
    async fn dispose_is_terminal_and_frees_everything() {
        let mut engine = engine(StubSource::ok(TRIANGLE_TILE));
        let viewport = bratislava();
        engine.render(&viewport).await.expect("render");
        assert!(engine.cached_tiles() > 0);

        let buffer = engine.program.vertex_buffer;
        let program = engine.program.program;
        engine.dispose();
        engine.dispose(); // idempotent

        assert!(engine.is_disposed());
        assert_eq!(engine.cached_tiles(), 0);
        assert!(engine.device().buffer_deleted(buffer));
        assert!(engine.device().program_deleted(program));
        assert_eq!(engine.render(&viewport).await, Err(EngineError::Disposed));
    }

    #[tokio::test]
    async fn resize_reaches_the_device() {
        let mut engine = engine(StubSource::ok(TRIANGLE_TILE));
        engine.resize(1024, 768);
        assert!(engine.device().events.contains(&Event::Resize(1024, 768)));
    }
}
