use axum::Json;

use crate::models::api::HealthResponse;

/// GET /health and /api/health — liveness probe.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
