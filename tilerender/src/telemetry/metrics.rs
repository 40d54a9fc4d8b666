//! Lock-free atomic metrics collection.

use super::TelemetrySnapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free metrics for the render dispatch loop.
///
/// All operations use `Relaxed` ordering; the counters are independent
/// measurements and need no ordering between each other.
pub struct RenderMetrics {
    /// When metrics collection started.
    start_time: Instant,

    /// Requests accepted onto the dispatch channel.
    requests_submitted: AtomicU64,
    /// Tiles rendered successfully.
    tiles_rendered: AtomicU64,
    /// Renders that failed (delivered as absent images).
    renders_failed: AtomicU64,
    /// Total encoded image bytes produced.
    bytes_rendered: AtomicU64,
    /// Total render time in microseconds.
    render_time_us: AtomicU64,
}

impl RenderMetrics {
    /// Creates a new metrics instance.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests_submitted: AtomicU64::new(0),
            tiles_rendered: AtomicU64::new(0),
            renders_failed: AtomicU64::new(0),
            bytes_rendered: AtomicU64::new(0),
            render_time_us: AtomicU64::new(0),
        }
    }

    /// Record a request accepted for dispatch.
    pub fn request_submitted(&self) {
        self.requests_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful render of `bytes` encoded output.
    pub fn tile_rendered(&self, bytes: usize, elapsed: Duration) {
        self.tiles_rendered.fetch_add(1, Ordering::Relaxed);
        self.bytes_rendered
            .fetch_add(bytes as u64, Ordering::Relaxed);
        self.render_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record a failed render.
    pub fn render_failed(&self, elapsed: Duration) {
        self.renders_failed.fetch_add(1, Ordering::Relaxed);
        self.render_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let tiles_rendered = self.tiles_rendered.load(Ordering::Relaxed);
        let renders_failed = self.renders_failed.load(Ordering::Relaxed);
        let render_time_us = self.render_time_us.load(Ordering::Relaxed);
        let completed = tiles_rendered + renders_failed;

        TelemetrySnapshot {
            uptime: self.start_time.elapsed(),
            requests_submitted: self.requests_submitted.load(Ordering::Relaxed),
            tiles_rendered,
            renders_failed,
            bytes_rendered: self.bytes_rendered.load(Ordering::Relaxed),
            avg_render_time_ms: if completed > 0 {
                render_time_us as f64 / completed as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}

impl Default for RenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let snapshot = RenderMetrics::new().snapshot();
        assert_eq!(snapshot.requests_submitted, 0);
        assert_eq!(snapshot.tiles_rendered, 0);
        assert_eq!(snapshot.renders_failed, 0);
        assert_eq!(snapshot.bytes_rendered, 0);
        assert_eq!(snapshot.avg_render_time_ms, 0.0);
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = RenderMetrics::new();
        metrics.request_submitted();
        metrics.request_submitted();
        metrics.tile_rendered(1000, Duration::from_millis(10));
        metrics.render_failed(Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_submitted, 2);
        assert_eq!(snapshot.tiles_rendered, 1);
        assert_eq!(snapshot.renders_failed, 1);
        assert_eq!(snapshot.bytes_rendered, 1000);
        assert!((snapshot.avg_render_time_ms - 20.0).abs() < 0.5);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let metrics = RenderMetrics::new();
        let before = metrics.snapshot();
        metrics.tile_rendered(42, Duration::from_millis(1));
        assert_eq!(before.tiles_rendered, 0);
        assert_eq!(metrics.snapshot().tiles_rendered, 1);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;

        let metrics = Arc::new(RenderMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.request_submitted();
                        metrics.tile_rendered(1, Duration::from_micros(1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_submitted, 8000);
        assert_eq!(snapshot.tiles_rendered, 8000);
        assert_eq!(snapshot.bytes_rendered, 8000);
    }
}
