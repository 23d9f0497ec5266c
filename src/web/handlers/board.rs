//! Board handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::Action;
use crate::community::{BoardUpdate, CommunityService};
use crate::forum::{board_context, ForumService, Pagination};
use crate::web::dto::{
    ApiResponse, BoardResponse, CreateThreadRequest, CreatedThreadResponse, PaginatedResponse,
    PaginationQuery, ThreadResponse, UpdateBoardRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::community::parse_role;
use crate::web::handlers::AppState;
use crate::web::middleware::{CurrentUser, MaybeUser};

/// GET /api/boards/:id - Board details.
pub async fn get_board(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(board_id): Path<i64>,
) -> Result<Json<ApiResponse<BoardResponse>>, ApiError> {
    let ctx = board_context(&state.db, board_id, viewer.user()).await?;
    ctx.access.check_board(&ctx.board, Action::ViewBoard)?;
    Ok(Json(ApiResponse::new(ctx.board.into())))
}

/// PUT /api/boards/:id - Update board settings (admin).
pub async fn update_board(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(board_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateBoardRequest>,
) -> Result<Json<ApiResponse<BoardResponse>>, ApiError> {
    let mut update = BoardUpdate::new();
    if let Some(name) = req.name {
        update = update.name(name);
    }
    if let Some(description) = req.description {
        update = update.description(Some(description));
    }
    if let Some(category_id) = req.category_id {
        update = update.category_id(category_id);
    }
    if let Some(sort_order) = req.sort_order {
        update = update.sort_order(sort_order);
    }
    if let Some(role) = req.min_read_role.as_deref() {
        update = update.min_read_role(parse_role(role)?);
    }
    if let Some(role) = req.min_write_role.as_deref() {
        update = update.min_write_role(parse_role(role)?);
    }
    if update.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let board = CommunityService::new(&state.db)
        .update_board(&current.user, board_id, update)
        .await?;
    Ok(Json(ApiResponse::new(board.into())))
}

/// GET /api/boards/:id/threads - Threads of a board, sticky first.
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(board_id): Path<i64>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<ThreadResponse>>, ApiError> {
    let per_page = pagination.per_page(state.config.forum.threads_per_page);
    let (_board, threads) = ForumService::new(&state.db, &state.config.forum)
        .list_threads(
            board_id,
            viewer.user(),
            Pagination::page(pagination.page(), per_page),
        )
        .await?;
    Ok(Json(PaginatedResponse::from_result(threads, Into::into)))
}

/// POST /api/boards/:id/threads - Start a thread.
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(board_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<CreateThreadRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedThreadResponse>>), ApiError> {
    let (thread, post) = ForumService::new(&state.db, &state.config.forum)
        .create_thread(board_id, &current.user, &req.title, &req.body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CreatedThreadResponse {
            thread: thread.into(),
            post: post.into(),
        })),
    ))
}
