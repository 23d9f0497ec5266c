//! Thread handlers: reading, replying and moderation.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::Action;
use crate::forum::{ForumService, Pagination, ThreadContext};
use crate::web::dto::{
    ApiResponse, MoveThreadRequest, PaginatedResponse, PaginationQuery, PostBodyRequest,
    PostResponse, StatusResponse, ThreadDetailResponse, ThreadResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{CurrentUser, MaybeUser};

fn thread_detail(ctx: ThreadContext) -> ThreadDetailResponse {
    let reply_action = if ctx.thread.is_locked {
        Action::ReplyToLocked
    } else {
        Action::Reply
    };
    ThreadDetailResponse {
        can_reply: ctx.access.check_board(&ctx.board, reply_action).is_ok(),
        can_moderate: ctx.access.is_moderator(),
        thread: ctx.thread.into(),
        board: ctx.board.into(),
    }
}

/// GET /api/threads/:id - Thread header with the caller's abilities.
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(thread_id): Path<i64>,
) -> Result<Json<ApiResponse<ThreadDetailResponse>>, ApiError> {
    let ctx = ForumService::new(&state.db, &state.config.forum)
        .get_thread(thread_id, viewer.user())
        .await?;
    Ok(Json(ApiResponse::new(thread_detail(ctx))))
}

/// DELETE /api/threads/:id - Delete a thread with its posts (moderator).
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(thread_id): Path<i64>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    ForumService::new(&state.db, &state.config.forum)
        .with_storage(&state.storage)
        .delete_thread(thread_id, &current.user)
        .await?;
    Ok(Json(ApiResponse::new(StatusResponse::ok())))
}

/// GET /api/threads/:id/posts - Posts in order.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(thread_id): Path<i64>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<PostResponse>>, ApiError> {
    let per_page = pagination.per_page(state.config.forum.posts_per_page);
    let posts = ForumService::new(&state.db, &state.config.forum)
        .list_posts(
            thread_id,
            viewer.user(),
            Pagination::page(pagination.page(), per_page),
        )
        .await?;
    Ok(Json(PaginatedResponse::from_result(posts, Into::into)))
}

/// POST /api/threads/:id/posts - Reply to a thread.
pub async fn reply(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(thread_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<PostBodyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PostResponse>>), ApiError> {
    let post = ForumService::new(&state.db, &state.config.forum)
        .reply(thread_id, &current.user, &req.body)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(post.into()))))
}

async fn set_locked(
    state: &AppState,
    current: &CurrentUser,
    thread_id: i64,
    locked: bool,
) -> Result<Json<ApiResponse<ThreadResponse>>, ApiError> {
    let thread = ForumService::new(&state.db, &state.config.forum)
        .set_locked(thread_id, &current.user, locked)
        .await?;
    Ok(Json(ApiResponse::new(thread.into())))
}

async fn set_sticky(
    state: &AppState,
    current: &CurrentUser,
    thread_id: i64,
    sticky: bool,
) -> Result<Json<ApiResponse<ThreadResponse>>, ApiError> {
    let thread = ForumService::new(&state.db, &state.config.forum)
        .set_sticky(thread_id, &current.user, sticky)
        .await?;
    Ok(Json(ApiResponse::new(thread.into())))
}

/// POST /api/threads/:id/lock
pub async fn lock_thread(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(thread_id): Path<i64>,
) -> Result<Json<ApiResponse<ThreadResponse>>, ApiError> {
    set_locked(&state, &current, thread_id, true).await
}

/// POST /api/threads/:id/unlock
pub async fn unlock_thread(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(thread_id): Path<i64>,
) -> Result<Json<ApiResponse<ThreadResponse>>, ApiError> {
    set_locked(&state, &current, thread_id, false).await
}

/// POST /api/threads/:id/sticky
pub async fn sticky_thread(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(thread_id): Path<i64>,
) -> Result<Json<ApiResponse<ThreadResponse>>, ApiError> {
    set_sticky(&state, &current, thread_id, true).await
}

/// POST /api/threads/:id/unsticky
pub async fn unsticky_thread(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(thread_id): Path<i64>,
) -> Result<Json<ApiResponse<ThreadResponse>>, ApiError> {
    set_sticky(&state, &current, thread_id, false).await
}

/// POST /api/threads/:id/move - Move to another board of the same community.
pub async fn move_thread(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(thread_id): Path<i64>,
    Json(req): Json<MoveThreadRequest>,
) -> Result<Json<ApiResponse<ThreadResponse>>, ApiError> {
    let thread = ForumService::new(&state.db, &state.config.forum)
        .move_thread(thread_id, &current.user, req.board_id)
        .await?;
    Ok(Json(ApiResponse::new(thread.into())))
}
