//! Concurrency-safe dispatch over the single render worker.
//!
//! The [`RenderDaemon`] is a long-running background task that owns
//! the non-reentrant [`TileRenderer`] and serves render requests from
//! a channel, strictly one at a time in submission order. Arbitrarily
//! many callers hold cloned [`RenderHandle`]s and receive results on
//! private oneshot channels, so no caller ever touches engine state.
//!
//! # Architecture
//!
//! ```text
//! RenderHandle ──┐
//! RenderHandle ──┼──► mpsc (FIFO) ──► RenderDaemon ──► TileRenderer ──► MapEngine
//! RenderHandle ──┘                        │
//!                                         └──► oneshot per request ──► caller
//! ```
//!
//! Worker-side failures are logged and converted into a
//! [`RenderResult`] with an absent image; every accepted request
//! yields exactly one delivered result.
//!
//! # Example
//!
//! ```ignore
//! use tilerender::dispatch::{DispatcherConfig, RenderDaemon};
//!
//! let renderer = TileRenderer::new(engine, projection, "osm.xml", RenderConfig::default())?;
//! let (daemon, handle) = RenderDaemon::new(renderer, DispatcherConfig::default());
//!
//! let shutdown = CancellationToken::new();
//! tokio::spawn(daemon.run(shutdown.clone()));
//!
//! let rx = handle.submit(TileCoord::new(0, 0, 0)).await?;
//! let result = rx.await?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::{CoordError, TileCoord};
use crate::engine::{MapEngine, Projection};
use crate::render::TileRenderer;
use crate::telemetry::{RenderMetrics, TelemetrySnapshot};

/// Default capacity of the request channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for the render daemon.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Request channel capacity; submitters suspend when it is full.
    pub channel_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Errors surfaced to submitters at the dispatch boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The tile address failed validation.
    #[error("Invalid tile address: {0}")]
    InvalidCoord(#[from] CoordError),

    /// The daemon has shut down and accepts no new submissions.
    #[error("Render dispatcher is shut down")]
    Shutdown,
}

/// One queued render request.
///
/// Created per submission and consumed exactly once by the daemon.
#[derive(Debug)]
struct RenderRequest {
    coord: TileCoord,
    response_tx: oneshot::Sender<RenderResult>,
}

/// The outcome delivered for a render request.
///
/// `image` is `None` when the render failed; the failure detail is
/// logged at the daemon, never raised across the channel. Exactly one
/// result is produced per accepted request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    /// The address this result answers, as submitted.
    pub coord: TileCoord,
    /// Encoded image bytes, or `None` on failure.
    pub image: Option<Vec<u8>>,
}

impl RenderResult {
    /// Whether the render produced an image.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// Cloneable submitter for the render daemon.
#[derive(Clone)]
pub struct RenderHandle {
    request_tx: mpsc::Sender<RenderRequest>,
    metrics: Arc<RenderMetrics>,
}

impl RenderHandle {
    /// Submit a tile address for rendering.
    ///
    /// Validates the address, then queues it; suspends while the
    /// request channel is full. Returns the private receiver on which
    /// exactly one [`RenderResult`] will arrive.
    ///
    /// # Errors
    ///
    /// * [`DispatchError::InvalidCoord`] - address outside the grid
    /// * [`DispatchError::Shutdown`] - the daemon is no longer running
    pub async fn submit(
        &self,
        coord: TileCoord,
    ) -> Result<oneshot::Receiver<RenderResult>, DispatchError> {
        coord.validate()?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(RenderRequest { coord, response_tx })
            .await
            .map_err(|_| DispatchError::Shutdown)?;

        self.metrics.request_submitted();
        Ok(response_rx)
    }

    /// Point-in-time copy of the daemon's metrics.
    pub fn metrics(&self) -> TelemetrySnapshot {
        self.metrics.snapshot()
    }
}

/// The render dispatch daemon.
///
/// Owns the renderer and the receiving end of the request channel.
/// Runs as a long-lived background task; requests are served strictly
/// FIFO and no request failure is fatal to the loop.
pub struct RenderDaemon<E, P>
where
    E: MapEngine,
    P: Projection,
{
    renderer: TileRenderer<E, P>,
    request_rx: mpsc::Receiver<RenderRequest>,
    metrics: Arc<RenderMetrics>,
}

impl<E, P> RenderDaemon<E, P>
where
    E: MapEngine,
    P: Projection,
{
    /// Creates a daemon with its channel.
    ///
    /// Returns the daemon and a handle that can be cloned for
    /// submitters.
    pub fn new(renderer: TileRenderer<E, P>, config: DispatcherConfig) -> (Self, RenderHandle) {
        let (request_tx, request_rx) = mpsc::channel(config.channel_capacity);
        let metrics = Arc::new(RenderMetrics::new());

        let daemon = Self {
            renderer,
            request_rx,
            metrics: Arc::clone(&metrics),
        };
        let handle = RenderHandle {
            request_tx,
            metrics,
        };

        (daemon, handle)
    }

    /// Runs the daemon until shutdown.
    ///
    /// The loop ends when the shutdown token is cancelled or when
    /// every handle has been dropped. On the handle-drop path all
    /// requests already queued are drained before the loop exits;
    /// cancellation stops after the in-flight request.
    ///
    /// Engine calls are synchronous, so renders block this task; run
    /// the daemon on its own thread or runtime when the engine does
    /// real work.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Render daemon starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Render daemon shutting down");
                    break;
                }

                maybe_request = self.request_rx.recv() => {
                    match maybe_request {
                        Some(request) => self.handle_request(request),
                        None => {
                            info!("Request channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("Render daemon stopped");
    }

    fn handle_request(&mut self, request: RenderRequest) {
        let coord = request.coord;
        let start = Instant::now();

        let image = match self.renderer.render(coord) {
            Ok(bytes) => {
                self.metrics.tile_rendered(bytes.len(), start.elapsed());
                debug!(
                    tile = %coord,
                    bytes = bytes.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Request served"
                );
                Some(bytes)
            }
            Err(e) => {
                self.metrics.render_failed(start.elapsed());
                warn!(tile = %coord, error = %e, "Tile render failed");
                None
            }
        };

        // Best-effort delivery: the caller may have stopped waiting.
        let _ = request.response_tx.send(RenderResult { coord, image });
    }
}
