//! Example workload endpoint
//!
//! Stands in for model inference: accepts any JSON object, simulates a short
//! computation and returns a fixed score. Each call records one prediction.

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

use super::ServerState;

pub const PREDICTION_SCORE: f64 = 0.42;

const INFERENCE_LATENCY: Duration = Duration::from_millis(20);

#[derive(Debug, Serialize)]
pub struct Prediction {
    pub score: f64,
}

pub async fn predict(
    State(state): State<ServerState>,
    Json(_features): Json<Map<String, Value>>,
) -> Json<Prediction> {
    tokio::time::sleep(INFERENCE_LATENCY).await;
    state.record_predictions(1);

    Json(Prediction {
        score: PREDICTION_SCORE,
    })
}
