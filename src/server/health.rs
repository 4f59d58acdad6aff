//! Health, pre-stop and metrics endpoints
//!
//! - `/live` - Liveness: Is the process alive?
//! - `/ready` - Readiness: Should the service receive new traffic?
//! - `/prestop` - Pre-stop hook: stop advertising readiness, then wait
//! - `/metrics` - Prometheus metrics in text format, optionally behind a bearer token
//! - `/predict` - Example workload

use axum::{
    extract::State,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{info, warn};

use super::interceptor::intercept;
use super::predict::predict;
use super::shutdown::ShutdownSignal;
use crate::health::HealthCoordinator;
use crate::lifecycle::LifecycleState;
use crate::telemetry::SharedMetrics;

/// Default time `/prestop` withholds its response after marking not ready,
/// so load balancers can stop routing before the process gets SIGTERM.
pub const DEFAULT_PRESTOP_DELAY: Duration = Duration::from_secs(8);

/// Deployment labels attached to every request log line
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    pub environment: String,
    pub pod_id: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            pod_id: "unknown".to_string(),
        }
    }
}

/// Shared state for every route and the request interceptor
#[derive(Clone)]
pub struct ServerState {
    pub(super) lifecycle: Arc<LifecycleState>,
    pub(super) health: Arc<HealthCoordinator>,
    pub(super) metrics: SharedMetrics,
    pub(super) identity: Arc<ServiceIdentity>,
    metrics_token: Option<Arc<str>>,
    prestop_delay: Duration,
}

impl ServerState {
    /// Create new server state
    pub fn new(
        lifecycle: Arc<LifecycleState>,
        health: Arc<HealthCoordinator>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            lifecycle,
            health,
            metrics,
            identity: Arc::new(ServiceIdentity::default()),
            metrics_token: None,
            prestop_delay: DEFAULT_PRESTOP_DELAY,
        }
    }

    /// Require `Authorization: Bearer <token>` on `/metrics`
    pub fn with_metrics_token(mut self, token: Option<&str>) -> Self {
        self.metrics_token = token.map(Arc::from);
        self
    }

    pub fn with_prestop_delay(mut self, delay: Duration) -> Self {
        self.prestop_delay = delay;
        self
    }

    pub fn with_identity(mut self, identity: ServiceIdentity) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    /// Count units of work towards the prediction rate and lifetime total
    pub(super) fn record_predictions(&self, n: u64) {
        self.lifecycle.record_work(n);
        self.metrics.record_predictions(n);
    }
}

#[derive(Debug, Serialize)]
struct PrestopResponse {
    ok: bool,
    draining: bool,
    delay_applied: bool,
}

/// Liveness probe handler
///
/// Always returns 200 OK - if this responds, the process is alive.
async fn live() -> impl IntoResponse {
    Json(json!({ "live": true }))
}

/// Readiness probe handler
///
/// Returns 200 OK if ready, 503 Service Unavailable if draining or any
/// dependency check failed.
async fn ready(State(state): State<ServerState>) -> impl IntoResponse {
    let verdict = state.health.check_readiness().await;
    let status = if verdict.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(verdict))
}

async fn prestop(State(state): State<ServerState>) -> impl IntoResponse {
    state.lifecycle.mark_not_ready();
    warn!(
        delay_secs = state.prestop_delay.as_secs_f64(),
        "preStop: draining"
    );

    tokio::time::sleep(state.prestop_delay).await;

    Json(PrestopResponse {
        ok: true,
        draining: true,
        delay_applied: true,
    })
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// The header is split on its first space. The scheme is matched
/// case-insensitively; the token is returned as sent, padding included.
pub(super) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    (!token.is_empty()).then_some(token)
}

/// Prometheus metrics handler
///
/// Returns metrics in Prometheus text format for scraping.
async fn metrics(State(state): State<ServerState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(expected) = state.metrics_token.as_deref() {
        if bearer_token(&headers) != Some(expected) {
            return (StatusCode::FORBIDDEN, Json(json!({ "detail": "Forbidden" }))).into_response();
        }
    }

    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Build the router for every endpoint, wrapped in the request interceptor
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/live", get(live))
        .route("/ready", get(ready))
        .route("/prestop", get(prestop).post(prestop))
        .route("/metrics", get(self::metrics))
        .route("/predict", post(predict))
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn_with_state(state.clone(), intercept))
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` fires.
///
/// New connections stop being accepted once shutdown begins; requests
/// already in flight are allowed to finish.
pub async fn run_server(
    listener: TcpListener,
    router: Router,
    shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "HTTP server listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}
