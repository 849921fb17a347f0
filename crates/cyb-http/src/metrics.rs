//! `GET /metrics` (spec §4.14, §9 "Observability on the HTTP edge"):
//! request counters exported in Prometheus text format, grounded on
//! `qc-16-api-gateway`'s `GatewayMetrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Request/connection counters for the HTTP edge.
pub struct EdgeMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    requests_errors: IntCounterVec,
    sse_connections: IntGauge,
    total_latency_ms: AtomicU64,
    latency_samples: AtomicU64,
}

impl EdgeMetrics {
    /// # Panics
    ///
    /// Panics if the fixed metric descriptors conflict with each other,
    /// which would only happen if this constructor itself were buggy.
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("cyb_http_requests_total", "Total HTTP requests handled"),
            &["route"],
        )
        .expect("static metric descriptor");
        let requests_errors = IntCounterVec::new(
            Opts::new("cyb_http_requests_errors_total", "HTTP requests that returned a non-2xx status"),
            &["route"],
        )
        .expect("static metric descriptor");
        let sse_connections = IntGauge::new("cyb_http_sse_connections", "Active SSE subscribers").expect("static metric descriptor");

        registry.register(Box::new(requests_total.clone())).expect("single registration");
        registry.register(Box::new(requests_errors.clone())).expect("single registration");
        registry.register(Box::new(sse_connections.clone())).expect("single registration");

        Self {
            registry,
            requests_total,
            requests_errors,
            sse_connections,
            total_latency_ms: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self, route: &str, success: bool, latency_ms: u64) {
        self.requests_total.with_label_values(&[route]).inc();
        if !success {
            self.requests_errors.with_label_values(&[route]).inc();
        }
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sse_connected(&self) {
        self.sse_connections.inc();
    }

    pub fn sse_disconnected(&self) {
        self.sse_connections.dec();
    }

    #[must_use]
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            0.0
        } else {
            total as f64 / samples as f64
        }
    }

    /// Render every registered metric as Prometheus text exposition format.
    ///
    /// # Panics
    ///
    /// Panics only if the underlying encoder produces non-UTF8 output,
    /// which `prometheus`'s `TextEncoder` never does.
    #[must_use]
    pub fn render(&self) -> String {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf).expect("prometheus text encoding");
        String::from_utf8(buf).expect("prometheus text encoder emits utf8")
    }
}

impl Default for EdgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Measures one request's latency and records it on drop-equivalent
/// `finish` call (grounded on `qc-16-api-gateway`'s `RequestTimer`).
pub struct RequestTimer<'a> {
    start: Instant,
    route: &'static str,
    metrics: &'a EdgeMetrics,
}

impl<'a> RequestTimer<'a> {
    #[must_use]
    pub fn start(route: &'static str, metrics: &'a EdgeMetrics) -> Self {
        Self {
            start: Instant::now(),
            route,
            metrics,
        }
    }

    pub fn finish(self, success: bool) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(self.route, success, latency_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_requests_and_errors_separately() {
        let m = EdgeMetrics::new();
        m.record_request("generate", true, 10);
        m.record_request("generate", false, 20);
        let rendered = m.render();
        assert!(rendered.contains("cyb_http_requests_total"));
        assert!(rendered.contains("cyb_http_requests_errors_total"));
    }

    #[test]
    fn average_latency_is_mean_of_samples() {
        let m = EdgeMetrics::new();
        m.record_request("generate", true, 100);
        m.record_request("generate", true, 300);
        assert!((m.average_latency_ms() - 200.0).abs() < 0.01);
    }

    #[test]
    fn sse_gauge_tracks_connect_disconnect() {
        let m = EdgeMetrics::new();
        m.sse_connected();
        m.sse_connected();
        m.sse_disconnected();
        assert!(m.render().contains("cyb_http_sse_connections 1"));
    }
}
