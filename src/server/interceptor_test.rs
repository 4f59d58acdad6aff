//! Tests for per-request accounting

use super::health::ServerState;
use super::interceptor::*;
use crate::health::{HealthCoordinator, RetryPolicy};
use crate::lifecycle::LifecycleState;
use crate::telemetry::{create_metrics, SharedMetrics};
use axum::{
    body::Body,
    extract::{Extension, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use uuid::Uuid;

/// Reports the in-flight count as seen from inside a handler
async fn in_flight(State(state): State<ServerState>) -> String {
    state.lifecycle.active_requests().to_string()
}

async fn echo_request_id(Extension(id): Extension<RequestId>) -> String {
    id.0
}

async fn boom() -> &'static str {
    panic!("handler blew up")
}

async fn teapot() -> StatusCode {
    StatusCode::IM_A_TEAPOT
}

fn setup() -> (Arc<LifecycleState>, SharedMetrics, Router) {
    let lifecycle = LifecycleState::shared();
    let metrics = create_metrics().unwrap();
    let health = Arc::new(HealthCoordinator::new(
        lifecycle.clone(),
        vec![],
        RetryPolicy::default(),
    ));
    let state = ServerState::new(lifecycle.clone(), health, metrics.clone());

    let router = Router::new()
        .route("/in-flight", get(in_flight))
        .route("/request-id", get(echo_request_id))
        .route("/boom", get(boom))
        .route("/teapot", get(teapot))
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn_with_state(state.clone(), intercept))
        .with_state(state);

    (lifecycle, metrics, router)
}

fn get_request(uri: &str, request_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(id) = request_id {
        builder = builder.header(REQUEST_ID_HEADER, id);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_inbound_request_id_is_echoed() {
    let (_, _, router) = setup();

    let response = router
        .oneshot(get_request("/request-id", Some("req-123")))
        .await
        .unwrap();

    assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-123");
    assert_eq!(body_string(response).await, "req-123");
}

#[tokio::test]
async fn test_missing_request_id_is_generated() {
    let (_, _, router) = setup();

    let response = router
        .oneshot(get_request("/request-id", None))
        .await
        .unwrap();

    let header = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(Uuid::parse_str(&header).is_ok(), "not a uuid: {}", header);
    assert_eq!(body_string(response).await, header, "Handler sees the same id");
}

#[tokio::test]
async fn test_request_is_in_flight_during_handler_only() {
    let (lifecycle, _, router) = setup();

    let response = router
        .oneshot(get_request("/in-flight", None))
        .await
        .unwrap();

    assert_eq!(body_string(response).await, "1");
    assert_eq!(lifecycle.active_requests(), 0);
}

#[tokio::test]
async fn test_request_metrics_use_method_path_status() {
    let (_, metrics, router) = setup();

    router
        .clone()
        .oneshot(get_request("/teapot", None))
        .await
        .unwrap();
    router
        .clone()
        .oneshot(get_request("/teapot", None))
        .await
        .unwrap();
    router
        .oneshot(get_request("/missing", None))
        .await
        .unwrap();

    assert_eq!(metrics.requests_total("GET", "/teapot", 418), 2.0);
    assert_eq!(metrics.requests_total("GET", "/missing", 404), 1.0);

    let body = metrics.encode().unwrap();
    assert!(body.contains(r#"http_request_duration_seconds_count{method="GET",path="/teapot"} 2"#));
}

/// A panicking handler still goes through the full exit accounting
#[tokio::test]
async fn test_panicking_handler_is_accounted() {
    let (lifecycle, metrics, router) = setup();

    let response = router
        .oneshot(get_request("/boom", Some("req-boom")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-boom");
    assert_eq!(lifecycle.active_requests(), 0);
    assert_eq!(metrics.requests_total("GET", "/boom", 500), 1.0);
}

/// A request dropped mid-flight (client disconnect) still releases its slot
#[tokio::test(start_paused = true)]
async fn test_cancelled_request_releases_slot() {
    let lifecycle = LifecycleState::shared();
    let metrics = create_metrics().unwrap();
    let health = Arc::new(HealthCoordinator::new(
        lifecycle.clone(),
        vec![],
        RetryPolicy::default(),
    ));
    let state = ServerState::new(lifecycle.clone(), health, metrics);
    let router = Router::new()
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "done"
            }),
        )
        .layer(middleware::from_fn_with_state(state.clone(), intercept))
        .with_state(state);

    let request = router.oneshot(get_request("/slow", None));
    let timed_out = tokio::time::timeout(Duration::from_secs(1), request).await;

    assert!(timed_out.is_err());
    assert_eq!(lifecycle.active_requests(), 0);
}

#[test]
fn test_request_id_from_headers() {
    let mut headers = HeaderMap::new();
    headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc"));
    assert_eq!(request_id_from(&headers), "abc");

    headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("   "));
    let generated = request_id_from(&headers);
    assert!(Uuid::parse_str(&generated).is_ok());

    let first = request_id_from(&HeaderMap::new());
    let second = request_id_from(&HeaderMap::new());
    assert_ne!(first, second, "Generated ids must be unique");
}
