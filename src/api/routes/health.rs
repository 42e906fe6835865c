use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub vector_store: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let is_healthy = state.search_service.stats().await.error.is_none();

    let response = ReadinessResponse {
        status: if is_healthy { "ready" } else { "not_ready" }.into(),
        vector_store: if is_healthy { "connected" } else { "disconnected" }.into(),
    };

    let status = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
