//! Point-in-time telemetry snapshot.

use std::fmt;
use std::time::Duration;

/// A copy of all render metrics at a moment in time.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    /// Time since metrics collection started.
    pub uptime: Duration,
    /// Requests accepted onto the dispatch channel.
    pub requests_submitted: u64,
    /// Tiles rendered successfully.
    pub tiles_rendered: u64,
    /// Renders delivered as absent images after failure.
    pub renders_failed: u64,
    /// Total encoded image bytes produced.
    pub bytes_rendered: u64,
    /// Mean wall-clock time per completed render in milliseconds.
    pub avg_render_time_ms: f64,
}

impl TelemetrySnapshot {
    /// Requests that have completed, successfully or not.
    pub fn completed(&self) -> u64 {
        self.tiles_rendered + self.renders_failed
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} failed, {} bytes, avg {:.1}ms",
            self.tiles_rendered, self.renders_failed, self.bytes_rendered, self.avg_render_time_ms
        )
    }
}
