//! User profile handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::{get_profile_by_username, update_profile, ProfileUpdateRequest, UserProfile};
use crate::db::UserRepository;
use crate::notification::NotificationService;
use crate::web::dto::{ApiResponse, MeResponse, UpdateProfileRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// GET /api/users/:username - Public profile.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = get_profile_by_username(&UserRepository::new(state.db.pool()), &username).await?;
    Ok(Json(ApiResponse::new(profile)))
}

/// PUT /api/users/me - Update the caller's profile.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let mut update = ProfileUpdateRequest::new();
    if let Some(display_name) = req.display_name {
        update = update.display_name(display_name);
    }
    if let Some(email) = req.email {
        update = update.email(Some(email));
    }
    if let Some(profile) = req.profile {
        update = update.profile(Some(profile));
    }
    if let Some(signature) = req.signature {
        update = update.signature(Some(signature));
    }

    let user = update_profile(&UserRepository::new(state.db.pool()), current.user.id, update).await?;
    let unread = NotificationService::new(&state.db).unread_count(&user).await?;
    tracing::debug!(user_id = user.id, "Profile updated");

    Ok(Json(ApiResponse::new(MeResponse::new(&user, unread))))
}
