use axum::{extract::State, http::header, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use swarmstream_core::SanitizedConfig;

use crate::metrics::encode_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub message: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// GET /
///
/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "swarmstream is running".to_string(),
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
