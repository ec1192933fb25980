//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub num_classes: usize,
    pub assistant_enabled: bool,
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        num_classes: state.classifier.labels().len(),
        assistant_enabled: state.assistant.is_some(),
    })
}
