//! Rendering engine and projection capabilities.
//!
//! The actual cartographic engine (stylesheet parsing, compositing,
//! image encoding) and the map projection live outside this crate.
//! This module defines the traits through which they are consumed:
//! [`MapEngine`] for the stateful, call-ordered render surface and
//! [`Projection`] for the forward geographic-to-planar transform.
//!
//! A `MapEngine` is not safe for concurrent use. Every method takes
//! `&mut self`, and the render pipeline keeps each engine instance
//! owned by exactly one [`TileRenderer`](crate::render::TileRenderer).

use thiserror::Error;

/// A geographic coordinate in degrees (EPSG:4326 axis convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LatLon {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// A planar coordinate in the engine's projected coordinate system
/// (typically Web Mercator, EPSG:3857). Units are opaque to this crate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedCoord {
    pub x: f64,
    pub y: f64,
}

impl ProjectedCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Errors reported by a rendering engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The stylesheet source could not be loaded.
    #[error("Failed to load style '{source_name}': {message}")]
    StyleLoad { source_name: String, message: String },

    /// The engine failed to produce image bytes for the current extent.
    #[error("Render failed: {0}")]
    Render(String),
}

/// Errors reported by a projection.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The forward transform could not produce a planar coordinate.
    #[error("Cannot project ({lon}, {lat}): {message}")]
    Forward { lon: f64, lat: f64, message: String },
}

/// The rendering engine capability.
///
/// Calls are synchronous and call-ordered: callers set the output
/// size, extent and buffer, then invoke [`render_to_bytes`]. The
/// sequence mutates engine state, which is why the engine must stay
/// behind a single owner.
///
/// [`render_to_bytes`]: MapEngine::render_to_bytes
pub trait MapEngine: Send {
    /// Load a stylesheet from an opaque source identifier.
    ///
    /// Called exactly once, at worker construction.
    fn load_style(&mut self, source: &str) -> Result<(), EngineError>;

    /// Set the output raster dimensions in pixels.
    fn set_output_size(&mut self, width: u32, height: u32);

    /// Set the rendering extent in projected-plane coordinates.
    fn set_extent(&mut self, min_x: f64, min_y: f64, max_x: f64, max_y: f64);

    /// Set the pixel buffer margin rendered around the extent.
    ///
    /// The margin avoids edge-clipping of geometry (labels, line caps)
    /// that crosses the tile boundary.
    fn set_buffer(&mut self, pixels: u32);

    /// Render the current extent and return the encoded image bytes.
    fn render_to_bytes(&mut self) -> Result<Vec<u8>, EngineError>;
}

/// The forward projection capability, derived from the engine's
/// configured projection.
pub trait Projection: Send {
    /// Map a geographic coordinate to the projected plane.
    fn forward(&self, coord: LatLon) -> Result<ProjectedCoord, ProjectionError>;
}

#[cfg(test)]
pub mod fakes {
    //! Instrumented fakes shared by render and dispatch tests.

    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// One recorded engine call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum EngineCall {
        LoadStyle(String),
        SetOutputSize(u32, u32),
        SetExtent {
            min_x: f64,
            min_y: f64,
            max_x: f64,
            max_y: f64,
        },
        SetBuffer(u32),
        Render,
    }

    /// Fake engine that records every call and detects overlapping
    /// renders.
    ///
    /// The call log and overlap flag are behind `Arc` so tests can
    /// keep handles after the engine moves into a renderer.
    #[derive(Debug)]
    pub struct RecordingEngine {
        calls: Arc<Mutex<Vec<EngineCall>>>,
        in_render: Arc<AtomicBool>,
        overlap_detected: Arc<AtomicBool>,
        render_delay: Option<Duration>,
        fail_renders: bool,
        fail_style_load: bool,
    }

    impl RecordingEngine {
        pub fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                in_render: Arc::new(AtomicBool::new(false)),
                overlap_detected: Arc::new(AtomicBool::new(false)),
                render_delay: None,
                fail_renders: false,
                fail_style_load: false,
            }
        }

        /// Fail every `render_to_bytes` call.
        pub fn failing() -> Self {
            Self {
                fail_renders: true,
                ..Self::new()
            }
        }

        /// Fail `load_style`.
        pub fn with_broken_style() -> Self {
            Self {
                fail_style_load: true,
                ..Self::new()
            }
        }

        /// Sleep inside `render_to_bytes` to widen the overlap window.
        pub fn with_render_delay(mut self, delay: Duration) -> Self {
            self.render_delay = Some(delay);
            self
        }

        /// Handle onto the call log, valid after the engine moves.
        pub fn calls_handle(&self) -> Arc<Mutex<Vec<EngineCall>>> {
            Arc::clone(&self.calls)
        }

        /// Handle onto the overlap flag, valid after the engine moves.
        pub fn overlap_handle(&self) -> Arc<AtomicBool> {
            Arc::clone(&self.overlap_detected)
        }

        fn record(&self, call: EngineCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl MapEngine for RecordingEngine {
        fn load_style(&mut self, source: &str) -> Result<(), EngineError> {
            self.record(EngineCall::LoadStyle(source.to_string()));
            if self.fail_style_load {
                return Err(EngineError::StyleLoad {
                    source_name: source.to_string(),
                    message: "fake style failure".to_string(),
                });
            }
            Ok(())
        }

        fn set_output_size(&mut self, width: u32, height: u32) {
            self.record(EngineCall::SetOutputSize(width, height));
        }

        fn set_extent(&mut self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) {
            self.record(EngineCall::SetExtent {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }

        fn set_buffer(&mut self, pixels: u32) {
            self.record(EngineCall::SetBuffer(pixels));
        }

        fn render_to_bytes(&mut self) -> Result<Vec<u8>, EngineError> {
            if self.in_render.swap(true, Ordering::SeqCst) {
                self.overlap_detected.store(true, Ordering::SeqCst);
            }
            if let Some(delay) = self.render_delay {
                std::thread::sleep(delay);
            }
            self.record(EngineCall::Render);

            let result = if self.fail_renders {
                Err(EngineError::Render("fake render failure".to_string()))
            } else {
                // Encode the last extent so each tile yields distinct,
                // verifiable bytes.
                let extent = self
                    .calls
                    .lock()
                    .unwrap()
                    .iter()
                    .rev()
                    .find_map(|c| match c {
                        EngineCall::SetExtent {
                            min_x,
                            min_y,
                            max_x,
                            max_y,
                        } => Some(format!("{min_x}:{min_y}:{max_x}:{max_y}")),
                        _ => None,
                    })
                    .unwrap_or_default();
                Ok(extent.into_bytes())
            };

            self.in_render.store(false, Ordering::SeqCst);
            result
        }
    }

    /// Fake projection that scales degrees linearly into the plane.
    ///
    /// `scale = 1.0` is the identity, which makes expected extents easy
    /// to read in tests.
    #[derive(Debug)]
    pub struct ScaledProjection {
        pub scale: f64,
    }

    impl ScaledProjection {
        pub fn identity() -> Self {
            Self { scale: 1.0 }
        }
    }

    impl Projection for ScaledProjection {
        fn forward(&self, coord: LatLon) -> Result<ProjectedCoord, ProjectionError> {
            Ok(ProjectedCoord::new(
                coord.lon * self.scale,
                coord.lat * self.scale,
            ))
        }
    }

    /// Fake projection that rejects every coordinate.
    pub struct FailingProjection;

    impl Projection for FailingProjection {
        fn forward(&self, coord: LatLon) -> Result<ProjectedCoord, ProjectionError> {
            Err(ProjectionError::Forward {
                lon: coord.lon,
                lat: coord.lat,
                message: "fake projection failure".to_string(),
            })
        }
    }
}
