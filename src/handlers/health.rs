use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;
use utoipa::ToSchema;

use crate::AppState;

/// Liveness payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    #[schema(example = "development")]
    pub env: String,
    /// RFC 3339 server time
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[schema(example = "up")]
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub time: String,
}

/// Plain-text root probe
pub async fn root() -> &'static str {
    "OK"
}

/// Basic liveness probe, never touches storage
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is alive", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        env: state.config.environment.clone(),
        time: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness probe - pings the lead store
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Storage reachable", body = ReadinessResponse),
        (status = 503, description = "Storage unreachable", body = ReadinessResponse)
    ),
    tag = "health"
)]
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let result = state.store.ping().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                database: "up".to_string(),
                latency_ms: Some(latency_ms),
                time: chrono::Utc::now().to_rfc3339(),
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ready: false,
                    database: "down".to_string(),
                    latency_ms: None,
                    time: chrono::Utc::now().to_rfc3339(),
                }),
            )
        }
    }
}
