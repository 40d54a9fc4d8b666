//! Tile addressing and coordinate conversion.
//!
//! Provides the [`TileCoord`] address type used throughout the rendering
//! pipeline, the row-numbering scheme flip between top-origin and
//! bottom-origin conventions, and the inverse Web Mercator conversion
//! from pixel positions to geographic coordinates.

use std::f64::consts::PI;
use std::fmt;

use thiserror::Error;

use crate::engine::LatLon;

/// Edge length of a rendered tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Minimum supported zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum supported zoom level.
///
/// Pixel-space math stays numerically stable in f64 well past this, but
/// 22 is the deepest level the rendering engines we target serve.
pub const MAX_ZOOM: u8 = 22;

/// Maximum latitude representable in Web Mercator (degrees).
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Web Mercator (degrees).
pub const MIN_LAT: f64 = -85.05112878;

/// Minimum longitude (degrees).
pub const MIN_LON: f64 = -180.0;

/// Errors from tile address validation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CoordError {
    /// Zoom level exceeds the supported range.
    #[error("Invalid zoom level {0} (max: {MAX_ZOOM})")]
    InvalidZoom(u8),

    /// Tile column outside `[0, 2^zoom - 1]`.
    #[error("Tile column {col} out of range at zoom {zoom}")]
    ColOutOfRange { col: u32, zoom: u8 },

    /// Tile row outside `[0, 2^zoom - 1]`.
    #[error("Tile row {row} out of range at zoom {zoom}")]
    RowOutOfRange { row: u32, zoom: u8 },
}

/// Row-numbering convention for tile addresses.
///
/// The same physical tile has two addresses depending on where row 0
/// sits. `TopOrigin` is the convention used by web tile servers and
/// `{z}/{x}/{y}.png` paths (row 0 at the north edge); `BottomOrigin`
/// is used by TMS-style serving specifications (row 0 at the south
/// edge). There is no third convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Row 0 at the north edge (web/OSM convention).
    TopOrigin,
    /// Row 0 at the south edge (TMS convention).
    BottomOrigin,
}

/// A tile address: column, row, zoom level and row-numbering scheme.
///
/// At zoom `z` the grid is `2^z × 2^z` tiles; valid rows and columns
/// are `[0, 2^z - 1]`. The address is a plain value type; the render
/// path trusts pre-validated input, and [`TileCoord::validate`] is
/// invoked at the dispatcher boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Tile column (X, increases eastward).
    pub col: u32,
    /// Tile row (Y; direction depends on `scheme`).
    pub row: u32,
    /// Zoom level.
    pub zoom: u8,
    /// Row-numbering convention of `row`.
    pub scheme: Scheme,
}

impl TileCoord {
    /// Create a top-origin tile address.
    pub fn new(col: u32, row: u32, zoom: u8) -> Self {
        Self {
            col,
            row,
            zoom,
            scheme: Scheme::TopOrigin,
        }
    }

    /// Create a bottom-origin (TMS) tile address.
    pub fn new_bottom_origin(col: u32, row: u32, zoom: u8) -> Self {
        Self {
            col,
            row,
            zoom,
            scheme: Scheme::BottomOrigin,
        }
    }

    /// Return this address under the target scheme.
    ///
    /// Applies the row flip `row' = 2^zoom - row - 1` only when the
    /// current scheme differs from the target; a no-op otherwise.
    /// The flip is involutive: applying it twice restores the input.
    pub fn with_scheme(self, target: Scheme) -> Self {
        if self.scheme == target {
            return self;
        }
        Self {
            col: self.col,
            row: (1u32 << self.zoom) - self.row - 1,
            zoom: self.zoom,
            scheme: target,
        }
    }

    /// Validate zoom, row and column against the grid bounds.
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(self.zoom));
        }
        let max = 1u32 << self.zoom;
        if self.col >= max {
            return Err(CoordError::ColOutOfRange {
                col: self.col,
                zoom: self.zoom,
            });
        }
        if self.row >= max {
            return Err(CoordError::RowOutOfRange {
                row: self.row,
                zoom: self.zoom,
            });
        }
        Ok(())
    }

    /// Canonical `{zoom}/{x}/{y}.png` path under top-origin addressing.
    ///
    /// Bottom-origin addresses are normalized before formatting, so the
    /// path always names the same physical tile.
    pub fn path(&self) -> String {
        let c = self.with_scheme(Scheme::TopOrigin);
        format!("{}/{}/{}.png", c.zoom, c.col, c.row)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// A position in the pixel canvas of a zoom level.
///
/// The canvas is `TILE_SIZE * 2^zoom` pixels square with the origin at
/// the top-left (north-west) corner; y increases southward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCorner {
    pub x: f64,
    pub y: f64,
}

impl PixelCorner {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Convert a pixel position at a zoom level to geographic coordinates.
///
/// Inverse of the standard slippy-map tiling formula: longitude is
/// linear in x across the canvas, latitude is the inverse Mercator
/// (Gudermannian) of the normalized y. Pure and total over valid pixel
/// ranges; f64 is stable through zoom 22.
#[inline]
pub fn pixel_to_lat_lon(pixel: PixelCorner, zoom: u8) -> LatLon {
    let canvas = TILE_SIZE as f64 * 2.0_f64.powi(zoom as i32);

    let lon = pixel.x / canvas * 360.0 - 180.0;

    let y = pixel.y / canvas;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    LatLon { lon, lat }
}
