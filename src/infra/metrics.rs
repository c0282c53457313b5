//! Lock-free session metrics and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that resets anything (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally; these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Session metrics collector
pub struct Metrics {
    /// Location events received from the feed (monotonic)
    location_events_total: AtomicU64,
    /// Location events received since last report
    location_events_since_report: AtomicU64,
    /// Location events dropped for missing coordinate (monotonic)
    location_events_dropped: AtomicU64,
    /// Navigation feedback sends attempted (monotonic)
    nav_feedback_sent: AtomicU64,
    /// Navigation feedback sends that failed (monotonic)
    nav_feedback_failed: AtomicU64,
    /// Operations rejected by a guard (monotonic)
    rejections_total: AtomicU64,
    /// Collaborator calls that failed (monotonic)
    provider_errors_total: AtomicU64,
    /// Routes computed and drawn (monotonic)
    routes_total: AtomicU64,
    /// POI markers placed on the map (monotonic)
    poi_markers_total: AtomicU64,
    /// Max location event handling time since last report (µs)
    handle_max_us: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            location_events_total: AtomicU64::new(0),
            location_events_since_report: AtomicU64::new(0),
            location_events_dropped: AtomicU64::new(0),
            nav_feedback_sent: AtomicU64::new(0),
            nav_feedback_failed: AtomicU64::new(0),
            rejections_total: AtomicU64::new(0),
            provider_errors_total: AtomicU64::new(0),
            routes_total: AtomicU64::new(0),
            poi_markers_total: AtomicU64::new(0),
            handle_max_us: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a location event with its handling time (lock-free)
    #[inline]
    pub fn record_location_event(&self, handle_us: u64) {
        self.location_events_total.fetch_add(1, Ordering::Relaxed);
        self.location_events_since_report.fetch_add(1, Ordering::Relaxed);
        self.handle_max_us.fetch_max(handle_us, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_location_dropped(&self) {
        self.location_events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_nav_feedback(&self, ok: bool) {
        self.nav_feedback_sent.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.nav_feedback_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_rejection(&self) {
        self.rejections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_provider_error(&self) {
        self.provider_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_route(&self) {
        self.routes_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_poi_markers(&self, count: u64) {
        self.poi_markers_total.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn location_events_total(&self) -> u64 {
        self.location_events_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn location_events_dropped(&self) -> u64 {
        self.location_events_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn nav_feedback_failed(&self) -> u64 {
        self.nav_feedback_failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejections_total(&self) -> u64 {
        self.rejections_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn provider_errors_total(&self) -> u64 {
        self.provider_errors_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn routes_total(&self) -> u64 {
        self.routes_total.load(Ordering::Relaxed)
    }

    /// Calculate and return metrics summary, then reset periodic counters
    pub fn report(&self) -> MetricsSummary {
        let events_count = self.location_events_since_report.swap(0, Ordering::Relaxed);
        let handle_max_us = self.handle_max_us.swap(0, Ordering::Relaxed);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };
        let secs = elapsed.as_secs_f64();
        let events_per_sec = if secs > 0.0 { events_count as f64 / secs } else { 0.0 };

        MetricsSummary {
            location_events_total: self.location_events_total(),
            location_events_per_sec: events_per_sec,
            location_events_dropped: self.location_events_dropped(),
            handle_max_us,
            nav_feedback_sent: self.nav_feedback_sent.load(Ordering::Relaxed),
            nav_feedback_failed: self.nav_feedback_failed(),
            rejections_total: self.rejections_total(),
            provider_errors_total: self.provider_errors_total(),
            routes_total: self.routes_total(),
            poi_markers_total: self.poi_markers_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub location_events_total: u64,
    pub location_events_per_sec: f64,
    pub location_events_dropped: u64,
    /// Max location event handling time in the report window (µs)
    pub handle_max_us: u64,
    pub nav_feedback_sent: u64,
    pub nav_feedback_failed: u64,
    pub rejections_total: u64,
    pub provider_errors_total: u64,
    pub routes_total: u64,
    pub poi_markers_total: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            location_events = %self.location_events_total,
            events_per_sec = format!("{:.1}", self.location_events_per_sec),
            dropped = %self.location_events_dropped,
            handle_max_us = %self.handle_max_us,
            nav_feedback = %self.nav_feedback_sent,
            nav_feedback_failed = %self.nav_feedback_failed,
            rejections = %self.rejections_total,
            provider_errors = %self.provider_errors_total,
            routes = %self.routes_total,
            poi_markers = %self.poi_markers_total,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.location_events_total(), 0);
        assert_eq!(metrics.rejections_total(), 0);
    }

    #[test]
    fn test_record_and_report() {
        let metrics = Metrics::new();
        metrics.record_location_event(120);
        metrics.record_location_event(80);
        metrics.record_location_dropped();
        metrics.record_nav_feedback(true);
        metrics.record_nav_feedback(false);
        metrics.record_rejection();
        metrics.record_route();
        metrics.record_poi_markers(3);

        let summary = metrics.report();
        assert_eq!(summary.location_events_total, 2);
        assert_eq!(summary.location_events_dropped, 1);
        assert_eq!(summary.handle_max_us, 120);
        assert_eq!(summary.nav_feedback_sent, 2);
        assert_eq!(summary.nav_feedback_failed, 1);
        assert_eq!(summary.rejections_total, 1);
        assert_eq!(summary.routes_total, 1);
        assert_eq!(summary.poi_markers_total, 3);

        // Periodic counters reset, monotonic ones do not
        let summary = metrics.report();
        assert_eq!(summary.handle_max_us, 0);
        assert_eq!(summary.location_events_total, 2);
    }
}
