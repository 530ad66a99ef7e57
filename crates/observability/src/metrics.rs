//! Prometheus metrics infrastructure
//!
//! This module provides the Prometheus exporter and the metric set recorded
//! by the gateway bridge. Without an installed exporter every handle is a
//! no-op.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Initialize the Prometheus metrics exporter
///
/// This starts an HTTP listener on the specified port that exposes metrics
/// at the `/metrics` endpoint.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Gateway bridge metrics
///
/// # Metrics
///
/// * `gateway_fetch_requests_total{what_to_show}` - Historical fetches issued
/// * `gateway_fetch_duration_seconds` - Time from issue to drain
/// * `gateway_fetch_timeouts_total` - Fetches whose deadline passed
/// * `gateway_rows_received_total` - Rows accepted into the pending table
/// * `gateway_late_callbacks_total` - Callbacks for ids no longer pending
/// * `gateway_errors_total` - Error events surfaced from the gateway
/// * `gateway_suppressed_warnings_total` - Known benign warnings filtered out
/// * `gateway_pending_requests` - Entries currently in the pending table
#[derive(Clone)]
pub struct BridgeMetrics {
    fetch_requests: fn(&'static str) -> Counter,
    fetch_duration: Histogram,
    fetch_timeouts: Counter,
    rows_received: Counter,
    late_callbacks: Counter,
    gateway_errors: Counter,
    suppressed_warnings: Counter,
    pending_requests: Gauge,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self {
            fetch_requests: |what_to_show| {
                counter!("gateway_fetch_requests_total", "what_to_show" => what_to_show)
            },
            fetch_duration: histogram!("gateway_fetch_duration_seconds"),
            fetch_timeouts: counter!("gateway_fetch_timeouts_total"),
            rows_received: counter!("gateway_rows_received_total"),
            late_callbacks: counter!("gateway_late_callbacks_total"),
            gateway_errors: counter!("gateway_errors_total"),
            suppressed_warnings: counter!("gateway_suppressed_warnings_total"),
            pending_requests: gauge!("gateway_pending_requests"),
        }
    }

    /// Record a fetch being issued and return a timer for its duration
    pub fn fetch_started(&self, what_to_show: &'static str) -> FetchTimer<'_> {
        (self.fetch_requests)(what_to_show).increment(1);
        FetchTimer {
            metrics: self,
            start: Instant::now(),
        }
    }

    pub fn fetch_timed_out(&self) {
        self.fetch_timeouts.increment(1);
    }

    pub fn row_received(&self) {
        self.rows_received.increment(1);
    }

    pub fn late_callback(&self) {
        self.late_callbacks.increment(1);
    }

    pub fn gateway_error(&self) {
        self.gateway_errors.increment(1);
    }

    pub fn warning_suppressed(&self) {
        self.suppressed_warnings.increment(1);
    }

    pub fn set_pending_requests(&self, count: usize) {
        self.pending_requests.set(count as f64);
    }

    fn record_fetch(&self, duration: Duration) {
        self.fetch_duration.record(duration.as_secs_f64());
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records the fetch duration when dropped
pub struct FetchTimer<'a> {
    metrics: &'a BridgeMetrics,
    start: Instant,
}

impl FetchTimer<'_> {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for FetchTimer<'_> {
    fn drop(&mut self) {
        self.metrics.record_fetch(self.start.elapsed());
    }
}
