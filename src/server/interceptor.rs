//! Per-request accounting
//!
//! Every request passes through [`intercept`], which:
//! - picks up the inbound `x-request-id` or generates one
//! - holds an in-flight slot in the lifecycle record for the request's duration
//! - records `http_requests_total` and `http_request_duration_seconds`
//! - logs one structured line per request
//! - echoes the request id on the response
//!
//! Handler panics are turned into 500 responses by the `CatchPanicLayer`
//! installed inside this middleware, so they are accounted like any other
//! response.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use super::ServerState;
use crate::telemetry::logging::REQUEST_LOG_TARGET;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id of the current request, available to handlers as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Reuse a usable inbound id, otherwise mint a fresh UUID v4
pub fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub async fn intercept(State(state): State<ServerState>, mut req: Request, next: Next) -> Response {
    let request_id = request_id_from(req.headers());
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let in_flight = state.lifecycle.track_request();
    let start = Instant::now();

    let mut response = next.run(req).await;

    drop(in_flight);
    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    state.metrics.record_request(
        method.as_str(),
        &path,
        status,
        Duration::from_millis(duration_ms),
    );

    info!(
        target: REQUEST_LOG_TARGET,
        request_id = %request_id,
        method = %method,
        path = %path,
        status_code = status,
        duration_ms,
        pod_id = %state.identity.pod_id,
        env = %state.identity.environment,
        "request"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}
