//! Operational control surface for an HTTP service
//!
//! Tracks liveness and readiness, drains in-flight requests on shutdown,
//! probes downstream dependencies with bounded retries, and publishes a
//! windowed prediction-rate gauge.

pub mod config;
pub mod deps;
pub mod health;
pub mod lifecycle;
pub mod server;
pub mod telemetry;
