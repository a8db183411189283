//! Health and metrics routes

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelStatus,
}

/// Model handle status
#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub load_policy: String,
    pub load_count: usize,
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model: ModelStatus {
            loaded: state.model.is_loaded(),
            load_policy: state.model.policy().as_str().to_string(),
            load_count: state.model.load_count(),
        },
    })
}

/// Prometheus exposition, 404 when no recorder is installed
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}
