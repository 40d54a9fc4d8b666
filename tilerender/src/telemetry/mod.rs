//! Render pipeline telemetry.
//!
//! Lock-free counters for the dispatch loop, with point-in-time
//! snapshots for display or logging.
//!
//! ```text
//! RenderDaemon ─────► RenderMetrics ─────► TelemetrySnapshot ─────► Views
//!                     (atomic counters)    (point-in-time copy)
//! ```

mod metrics;
mod snapshot;

pub use metrics::RenderMetrics;
pub use snapshot::TelemetrySnapshot;
