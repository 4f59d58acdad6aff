//! HTTP server for health, metrics and workload endpoints
//!
//! Provides Kubernetes health probes:
//! - `/live` - Liveness probe (process is running)
//! - `/ready` - Readiness probe (not draining and dependencies reachable)
//! - `/prestop` - Pre-stop hook
//!
//! Also provides graceful shutdown handling for SIGTERM/SIGINT.

mod health;
pub mod integrations;
mod interceptor;
mod predict;
pub mod shutdown;

pub use health::{
    build_router, run_server, ServerState, ServiceIdentity, DEFAULT_PRESTOP_DELAY,
};
pub use integrations::Integrations;
pub use interceptor::{request_id_from, RequestId, REQUEST_ID_HEADER};
pub use predict::PREDICTION_SCORE;
pub use shutdown::{
    serve_until_shutdown, shutdown_channel, spawn_signal_listener, wait_for_signal,
    ShutdownController, ShutdownSignal, TerminationSignals,
};

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "interceptor_test.rs"]
mod interceptor_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
