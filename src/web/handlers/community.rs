//! Community, category and moderator handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::community::{CommunityService, NewBoard};
use crate::db::Role;
use crate::web::dto::{
    AddModeratorRequest, ApiResponse, BoardResponse, CategoryResponse, CommunityOverviewResponse,
    CommunityResponse, CreateBoardRequest, CreateCategoryRequest, CreateCommunityRequest,
    ModeratorResponse, StatusResponse, UpdateCategoryRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{CurrentUser, MaybeUser};

/// Parse a role already checked by the DTO rules.
pub(crate) fn parse_role(value: &str) -> Result<Role, ApiError> {
    value.parse().map_err(ApiError::unprocessable)
}

/// GET /api/communities - List communities.
pub async fn list_communities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CommunityResponse>>>, ApiError> {
    let communities = CommunityService::new(&state.db).list_communities().await?;
    Ok(Json(ApiResponse::new(
        communities.into_iter().map(Into::into).collect(),
    )))
}

/// POST /api/communities - Create a community (admin).
pub async fn create_community(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateCommunityRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CommunityResponse>>), ApiError> {
    let community = CommunityService::new(&state.db)
        .create_community(
            &current.user,
            &req.slug,
            &req.name,
            req.description.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(community.into()))))
}

/// GET /api/communities/:slug - Community with its categories and the boards
/// the caller can read.
pub async fn get_community(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CommunityOverviewResponse>>, ApiError> {
    let overview = CommunityService::new(&state.db)
        .overview(&slug, viewer.user())
        .await?;
    Ok(Json(ApiResponse::new(overview.into())))
}

/// POST /api/communities/:slug/categories - Create a category (admin).
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(slug): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), ApiError> {
    let service = CommunityService::new(&state.db);
    let community = service.get_community(&slug).await?;
    let category = service
        .create_category(&current.user, community.id, &req.name, req.sort_order)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(category.into()))))
}

/// PUT /api/categories/:id - Rename or reorder a category (admin).
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(category_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryResponse>>, ApiError> {
    let category = CommunityService::new(&state.db)
        .update_category(
            &current.user,
            category_id,
            req.name.as_deref(),
            req.sort_order,
        )
        .await?;
    Ok(Json(ApiResponse::new(category.into())))
}

/// POST /api/communities/:slug/boards - Create a board (admin).
pub async fn create_board(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(slug): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateBoardRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BoardResponse>>), ApiError> {
    let service = CommunityService::new(&state.db);
    let community = service.get_community(&slug).await?;

    let mut new_board = NewBoard::new(community.id, req.category_id, req.slug, req.name)
        .with_sort_order(req.sort_order);
    if let Some(description) = req.description {
        new_board = new_board.with_description(description);
    }
    if let Some(role) = req.min_read_role.as_deref() {
        new_board = new_board.with_min_read_role(parse_role(role)?);
    }
    if let Some(role) = req.min_write_role.as_deref() {
        new_board = new_board.with_min_write_role(parse_role(role)?);
    }

    let board = service.create_board(&current.user, new_board).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(board.into()))))
}

/// GET /api/communities/:slug/moderators - List community moderators.
pub async fn list_moderators(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<ModeratorResponse>>>, ApiError> {
    let service = CommunityService::new(&state.db);
    let community = service.get_community(&slug).await?;
    let moderators = service.list_moderators(community.id).await?;
    Ok(Json(ApiResponse::new(
        moderators.into_iter().map(Into::into).collect(),
    )))
}

/// POST /api/communities/:slug/moderators - Appoint a moderator (admin).
pub async fn add_moderator(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(slug): Path<String>,
    Json(req): Json<AddModeratorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StatusResponse>>), ApiError> {
    let service = CommunityService::new(&state.db);
    let community = service.get_community(&slug).await?;
    service
        .add_moderator(&current.user, community.id, req.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(StatusResponse::ok()))))
}

/// DELETE /api/communities/:slug/moderators/:user_id - Remove a moderator (admin).
pub async fn remove_moderator(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((slug, user_id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let service = CommunityService::new(&state.db);
    let community = service.get_community(&slug).await?;
    service
        .remove_moderator(&current.user, community.id, user_id)
        .await?;
    Ok(Json(ApiResponse::new(StatusResponse::ok())))
}
