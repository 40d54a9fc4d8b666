//! The serialized tile render worker.
//!
//! [`TileRenderer`] owns one rendering engine instance for its whole
//! lifetime, converts tile addresses into projected bounding boxes and
//! drives the engine's set-extent-then-render call sequence. The
//! per-request engine mutation is exactly why this type is not
//! reentrant: `render` takes `&mut self`, and concurrent callers go
//! through the [`dispatch`](crate::dispatch) module instead of sharing
//! a renderer.

use tracing::debug;

use crate::coord::{pixel_to_lat_lon, PixelCorner, Scheme, TileCoord, TILE_SIZE};
use crate::engine::{EngineError, MapEngine, Projection, ProjectionError};

use thiserror::Error;

/// Default pixel buffer margin rendered around a tile's extent.
pub const DEFAULT_BUFFER_PX: u32 = 128;

/// Configuration for a tile renderer.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Pixel buffer margin around the tile extent, to avoid visible
    /// seams from geometry clipped at the tile boundary.
    pub buffer_px: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            buffer_px: DEFAULT_BUFFER_PX,
        }
    }
}

/// Errors from a single tile render.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The projection could not map a tile corner to the plane.
    #[error("Projection failed: {0}")]
    Projection(#[from] ProjectionError),

    /// The engine failed to load the style or produce image bytes.
    #[error("Engine failed: {0}")]
    Engine(#[from] EngineError),
}

/// Renders map tiles through an exclusively owned engine.
///
/// The stylesheet is loaded once at construction; afterwards every
/// [`render`](TileRenderer::render) call mutates the engine's extent,
/// buffer and output size before producing an image. The worker must
/// therefore never be invoked concurrently - ownership by a single
/// dispatch daemon is the intended deployment.
#[derive(Debug)]
pub struct TileRenderer<E, P>
where
    E: MapEngine,
    P: Projection,
{
    engine: E,
    projection: P,
    config: RenderConfig,
}

impl<E, P> TileRenderer<E, P>
where
    E: MapEngine,
    P: Projection,
{
    /// Create a renderer, loading the stylesheet into the engine.
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine instance, exclusively owned from here on
    /// * `projection` - Forward projection matching the engine's
    ///   configured coordinate system
    /// * `stylesheet` - Opaque style source identifier, consumed once
    /// * `config` - Buffer margin configuration
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Engine` if the stylesheet cannot be
    /// loaded.
    pub fn new(
        mut engine: E,
        projection: P,
        stylesheet: &str,
        config: RenderConfig,
    ) -> Result<Self, RenderError> {
        engine.load_style(stylesheet)?;
        Ok(Self {
            engine,
            projection,
            config,
        })
    }

    /// Render one tile and return the encoded image bytes.
    ///
    /// The address is normalized to top-origin row numbering first, so
    /// both schemes render the same physical tile. Projection and
    /// engine failures propagate; converting them into an
    /// absent-image result is the dispatcher's job.
    pub fn render(&mut self, coord: TileCoord) -> Result<Vec<u8>, RenderError> {
        let coord = coord.with_scheme(Scheme::TopOrigin);
        let tile = TILE_SIZE as f64;

        // Pixel positions of the tile's bottom-left and top-right
        // corners. Pixel y grows southward, so the geographic bottom
        // is the larger pixel row.
        let bottom_left = PixelCorner::new(coord.col as f64 * tile, (coord.row as f64 + 1.0) * tile);
        let top_right = PixelCorner::new((coord.col as f64 + 1.0) * tile, coord.row as f64 * tile);

        let ll0 = pixel_to_lat_lon(bottom_left, coord.zoom);
        let ll1 = pixel_to_lat_lon(top_right, coord.zoom);

        let c0 = self.projection.forward(ll0)?;
        let c1 = self.projection.forward(ll1)?;

        self.engine.set_output_size(TILE_SIZE, TILE_SIZE);
        self.engine
            .set_extent(c0.x.min(c1.x), c0.y.min(c1.y), c0.x.max(c1.x), c0.y.max(c1.y));
        self.engine.set_buffer(self.config.buffer_px);

        let bytes = self.engine.render_to_bytes()?;
        debug!(tile = %coord, bytes = bytes.len(), "tile rendered");
        Ok(bytes)
    }
}
