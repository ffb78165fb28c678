//! Gateway counters.
//!
//! Exposed as JSON on the admin `/metrics` route, and in Prometheus text
//! format when the `metrics` feature is enabled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Beacon gateway metrics
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_error: AtomicU64,

    // Binary (SSZ) traffic
    pub ssz_responses: AtomicU64,
    pub ssz_posts: AtomicU64,

    // Event streams
    pub streams_open: AtomicU64,
    pub streams_opened_total: AtomicU64,
    pub events_relayed: AtomicU64,
    pub stream_errors: AtomicU64,

    // Latency tracking
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished request
    pub fn record_request(&self, success: bool, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ssz_response(&self) {
        self.ssz_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ssz_post(&self) {
        self.ssz_posts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a client event stream entering the relaying state
    pub fn record_stream_open(&self) {
        self.streams_open.fetch_add(1, Ordering::Relaxed);
        self.streams_opened_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_close(&self) {
        self.streams_open.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_error(&self) {
        self.stream_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics in Prometheus text format
    #[cfg(feature = "metrics")]
    pub fn to_prometheus(&self) -> Result<String, prometheus::Error> {
        use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

        let registry = Registry::new();
        let counters = [
            ("beacon_gateway_requests_total", "Total number of API requests", &self.requests_total),
            ("beacon_gateway_requests_success_total", "Successful requests", &self.requests_success),
            ("beacon_gateway_requests_error_total", "Failed requests", &self.requests_error),
            ("beacon_gateway_ssz_responses_total", "Responses served as SSZ", &self.ssz_responses),
            ("beacon_gateway_ssz_posts_total", "SSZ request bodies accepted", &self.ssz_posts),
            ("beacon_gateway_streams_opened_total", "Event streams opened", &self.streams_opened_total),
            ("beacon_gateway_events_relayed_total", "Events relayed to clients", &self.events_relayed),
            ("beacon_gateway_stream_errors_total", "Event streams closed by an error", &self.stream_errors),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::new(name, help)?;
            counter.inc_by(value.load(Ordering::Relaxed));
            registry.register(Box::new(counter))?;
        }

        let open = IntGauge::new("beacon_gateway_streams_open", "Active event streams")?;
        open.set(i64::try_from(self.streams_open.load(Ordering::Relaxed)).unwrap_or(i64::MAX));
        registry.register(Box::new(open))?;

        let latency = Gauge::new("beacon_gateway_average_latency_ms", "Average request latency")?;
        latency.set(self.average_latency_ms());
        registry.register(Box::new(latency))?;

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
                "error": self.requests_error.load(Ordering::Relaxed),
            },
            "ssz": {
                "responses": self.ssz_responses.load(Ordering::Relaxed),
                "posts": self.ssz_posts.load(Ordering::Relaxed),
            },
            "events": {
                "streams_open": self.streams_open.load(Ordering::Relaxed),
                "streams_opened": self.streams_opened_total.load(Ordering::Relaxed),
                "relayed": self.events_relayed.load(Ordering::Relaxed),
                "errors": self.stream_errors.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<GatewayMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, success: bool) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(success, latency_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = GatewayMetrics::new();

        metrics.record_request(true, 100);
        metrics.record_request(true, 200);
        metrics.record_request(false, 50);
        metrics.record_ssz_response();

        assert_eq!(metrics.requests_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.requests_success.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.requests_error.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.ssz_responses.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_average_latency() {
        let metrics = GatewayMetrics::new();

        metrics.record_request(true, 100);
        metrics.record_request(true, 200);
        metrics.record_request(true, 300);

        assert!((metrics.average_latency_ms() - 200.0).abs() < 0.01);
    }

    #[test]
    fn test_stream_metrics() {
        let metrics = GatewayMetrics::new();

        metrics.record_stream_open();
        metrics.record_stream_open();
        metrics.record_event();
        metrics.record_stream_close();

        assert_eq!(metrics.streams_open.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.streams_opened_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.events_relayed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_json_export() {
        let metrics = GatewayMetrics::new();
        metrics.record_request(true, 100);
        metrics.record_ssz_post();

        let json = metrics.to_json();
        assert_eq!(json["requests"]["total"], 1);
        assert_eq!(json["ssz"]["posts"], 1);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_prometheus_export() {
        let metrics = GatewayMetrics::new();
        metrics.record_event();
        let text = metrics.to_prometheus().unwrap();
        assert!(text.contains("beacon_gateway_events_relayed_total 1"));
        assert!(text.contains("beacon_gateway_streams_open 0"));
    }
}
