//! Tracing subscriber setup
//!
//! The filter comes from `RUST_LOG` (default `info`). Production output is one
//! JSON object per line; `LOG_FORMAT=pretty` switches to human-readable output
//! for local runs.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Target used for the per-request log line
pub const REQUEST_LOG_TARGET: &str = "sentinel::request";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber. Call once, first thing in `main`.
pub fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());

    match format {
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .init(),
        LogFormat::Pretty => builder.init(),
    }
}
