//! Control plane
//!
//! HTTP/JSON surface for the operator console. Every handler only touches
//! `SensorState`, which is non-blocking by contract, so no call ever waits
//! on the emission thread's sleep. Concurrent calls serialize through the
//! state's own lock; there is no locking at this layer.

use crate::state::{SensorState, StateSnapshot};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub sensor: Arc<SensorState>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/pause", post(pause))
        .route("/resume", post(resume))
        .route("/stop", post(stop))
        .route("/interval", put(set_interval))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntervalRequest {
    pub ms: u64,
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(state): State<AppState>) -> Json<StateSnapshot> {
    Json(state.sensor.snapshot())
}

async fn pause(State(state): State<AppState>) -> (StatusCode, &'static str) {
    state.sensor.set_paused(true);
    tracing::info!("control: pause");
    (StatusCode::OK, "paused")
}

async fn resume(State(state): State<AppState>) -> (StatusCode, &'static str) {
    state.sensor.set_paused(false);
    tracing::info!("control: resume");
    (StatusCode::OK, "resumed")
}

async fn stop(State(state): State<AppState>) -> (StatusCode, &'static str) {
    state.sensor.set_running(false);
    tracing::info!("control: stop");
    (StatusCode::OK, "stopping")
}

async fn set_interval(
    State(state): State<AppState>,
    Json(request): Json<IntervalRequest>,
) -> (StatusCode, String) {
    match state
        .sensor
        .set_interval(Duration::from_millis(request.ms))
    {
        Ok(()) => {
            tracing::info!("control: interval set to {}ms", request.ms);
            (StatusCode::OK, format!("interval set to {}ms", request.ms))
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()),
    }
}
