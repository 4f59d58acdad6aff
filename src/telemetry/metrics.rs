//! Prometheus metrics sink
//!
//! All metrics live in a registry owned by [`Metrics`] rather than the
//! process-global default registry, so independent instances (one per test)
//! never collide.

use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Shared handle passed to the server, interceptor and rate aggregator
pub type SharedMetrics = Arc<Metrics>;

pub struct Metrics {
    registry: Registry,
    requests_total: CounterVec,
    request_duration_seconds: HistogramVec,
    predictions_total: Counter,
    predictions_per_second: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("http_requests_total", "HTTP requests"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "Latency"),
            &["method", "path"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let predictions_total = Counter::new("predictions_total", "Total predictions")?;
        registry.register(Box::new(predictions_total.clone()))?;

        let predictions_per_second =
            Gauge::new("predictions_per_second", "Predictions/sec (per pod)")?;
        registry.register(Box::new(predictions_per_second.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            predictions_total,
            predictions_per_second,
        })
    }

    /// Record one completed request
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration: Duration) {
        self.requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration.as_secs_f64());
    }

    pub fn record_predictions(&self, n: u64) {
        self.predictions_total.inc_by(n as f64);
    }

    pub fn set_predictions_per_second(&self, rate: f64) {
        self.predictions_per_second.set(rate);
    }

    pub fn predictions_total(&self) -> f64 {
        self.predictions_total.get()
    }

    pub fn predictions_per_second(&self) -> f64 {
        self.predictions_per_second.get()
    }

    /// Requests counted so far for one label combination
    pub fn requests_total(&self, method: &str, path: &str, status: u16) -> f64 {
        self.requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Create the shared metrics handle
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Metrics::new().map(Arc::new)
}
