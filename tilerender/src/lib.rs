//! Tilerender - serialized slippy-map tile rendering.
//!
//! This library turns `{zoom}/{x}/{y}` tile addresses into projected
//! bounding boxes and dispatches render work to a cartographic engine
//! that can only process one render at a time. The engine itself and
//! the map projection are external collaborators, consumed through the
//! traits in [`engine`].
//!
//! # Pipeline
//!
//! ```text
//! caller ──► RenderHandle::submit ──► RenderDaemon (FIFO, one at a time)
//!                                          │
//!                  TileCoord ──► pixel corners ──► lat/lon ──► projected extent
//!                                          │
//!                                     MapEngine ──► encoded image bytes
//! ```
//!
//! Concurrent callers clone a [`dispatch::RenderHandle`]; each
//! submission is answered exactly once on a private channel, with
//! failures delivered as absent images rather than silence.

pub mod coord;
pub mod dispatch;
pub mod engine;
pub mod logging;
pub mod render;
pub mod telemetry;

pub use coord::{CoordError, PixelCorner, Scheme, TileCoord, MAX_ZOOM, MIN_ZOOM, TILE_SIZE};
pub use dispatch::{DispatchError, DispatcherConfig, RenderDaemon, RenderHandle, RenderResult};
pub use engine::{EngineError, LatLon, MapEngine, Projection, ProjectedCoord, ProjectionError};
pub use render::{RenderConfig, RenderError, TileRenderer};
