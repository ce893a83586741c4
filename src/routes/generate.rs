use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::models::api::{ErrorResponse, GenerationResponse, GenerationStatus, ModelsResponse};
use crate::models::generation::GenerationRequest;
use crate::services::stub::StubError;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: StubError) -> ApiError {
    let status = match e {
        StubError::Invalid(_) => StatusCode::BAD_REQUEST,
        StubError::UnknownTask(_) => StatusCode::NOT_FOUND,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

/// POST /api/generate — queue a generation request.
pub async fn submit_generation(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    state.backend.create(request).await.map(Json).map_err(api_error)
}

/// GET /api/status/{task_id} — check generation task status.
pub async fn get_generation_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<GenerationStatus>, ApiError> {
    state.backend.status(&task_id).await.map(Json).map_err(api_error)
}

/// GET /api/models — list selectable models.
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.backend.models(),
    })
}
