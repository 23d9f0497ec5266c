//! Site-level endpoints.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::bbcode;
use crate::web::dto::{ApiResponse, HealthResponse, PreviewRequest, PreviewResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::new(HealthResponse {
        status: "ok",
        name: state.config.forum.name.clone(),
    }))
}

/// POST /api/bbcode/preview - Render BBCode without saving it.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<PreviewRequest>,
) -> Result<Json<ApiResponse<PreviewResponse>>, ApiError> {
    let max = state.config.forum.max_body_length;
    if req.body.chars().count() > max {
        return Err(ApiError::unprocessable(format!(
            "body must be at most {max} characters"
        )));
    }
    Ok(Json(ApiResponse::new(PreviewResponse {
        html: bbcode::render(&req.body),
    })))
}
