//! Notification handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::forum::Pagination;
use crate::notification::NotificationService;
use crate::web::dto::{
    ApiResponse, CountResponse, NotificationListQuery, NotificationResponse, PaginatedResponse,
    StatusResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

const DEFAULT_PER_PAGE: u32 = 20;

/// GET /api/notifications?unread= - The caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<PaginatedResponse<NotificationResponse>>, ApiError> {
    let pagination = Pagination::page(
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    );
    let notifications = NotificationService::new(&state.db)
        .list(&current.user, query.unread, pagination)
        .await?;
    Ok(Json(PaginatedResponse::from_result(notifications, Into::into)))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(notification_id): Path<i64>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    NotificationService::new(&state.db)
        .mark_read(&current.user, notification_id)
        .await?;
    Ok(Json(ApiResponse::new(StatusResponse::ok())))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = NotificationService::new(&state.db)
        .mark_all_read(&current.user)
        .await?;
    Ok(Json(ApiResponse::new(CountResponse { count })))
}
