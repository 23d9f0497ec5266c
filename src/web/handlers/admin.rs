//! Site administration handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::forum::Pagination;
use crate::moderation::AdminService;
use crate::web::dto::{
    ApiResponse, PaginatedResponse, PaginationQuery, SetActiveRequest, SetRoleRequest,
    UserResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::community::parse_role;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// GET /api/admin/users - All accounts.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let users = AdminService::new(&state.db)
        .list_users(
            &current.user,
            Pagination::page(pagination.page(), pagination.per_page(50)),
        )
        .await?;
    Ok(Json(PaginatedResponse::from_result(users, |u| {
        UserResponse::from(&u)
    })))
}

/// PUT /api/admin/users/:id/role - Change a user's global role.
pub async fn set_role(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(user_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<SetRoleRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let role = parse_role(&req.role)?;
    let user = AdminService::new(&state.db)
        .set_role(&current.user, user_id, role)
        .await?;
    Ok(Json(ApiResponse::new(UserResponse::from(&user))))
}

/// PUT /api/admin/users/:id/active - Activate or deactivate an account.
pub async fn set_active(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(user_id): Path<i64>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = AdminService::new(&state.db)
        .set_active(&current.user, user_id, req.active)
        .await?;
    Ok(Json(ApiResponse::new(UserResponse::from(&user))))
}
