//! Logging, metrics and rate telemetry

pub mod logging;
pub mod metrics;
pub mod rate;

pub use metrics::{create_metrics, Metrics, SharedMetrics};
pub use rate::RateAggregator;

#[cfg(test)]
#[path = "rate_test.rs"]
mod rate_tests;
