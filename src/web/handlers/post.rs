//! Post handlers: editing, deletion, reactions, reports and uploads.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::attachment::AttachmentService;
use crate::forum::ForumService;
use crate::moderation::ModerationService;
use crate::reaction::{ReactionKind, ReactionService};
use crate::web::dto::{
    ApiResponse, AttachmentResponse, PostBodyRequest, PostResponse, ReactionRequest,
    ReactionSummaryResponse, ReactionToggleResponse, ReportRequest, ReportResponse,
    StatusResponse, ValidatedJson,
};
use crate::web::error::{ApiError, ErrorCode};
use crate::web::handlers::AppState;
use crate::web::middleware::{CurrentUser, MaybeUser};

/// Form field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// GET /api/posts/:id - A single post.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ApiResponse<PostResponse>>, ApiError> {
    let ctx = ForumService::new(&state.db, &state.config.forum)
        .get_post(post_id, viewer.user())
        .await?;
    Ok(Json(ApiResponse::new(ctx.post.into())))
}

/// PUT /api/posts/:id - Edit a post.
pub async fn edit_post(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(post_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<PostBodyRequest>,
) -> Result<Json<ApiResponse<PostResponse>>, ApiError> {
    let post = ForumService::new(&state.db, &state.config.forum)
        .edit_post(post_id, &current.user, &req.body)
        .await?;
    Ok(Json(ApiResponse::new(post.into())))
}

/// DELETE /api/posts/:id - Soft-delete a post.
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    ForumService::new(&state.db, &state.config.forum)
        .delete_post(post_id, &current.user)
        .await?;
    Ok(Json(ApiResponse::new(StatusResponse::ok())))
}

/// GET /api/posts/:id/reactions - Reaction counts and the caller's own.
pub async fn get_reactions(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ApiResponse<ReactionSummaryResponse>>, ApiError> {
    let summary = ReactionService::new(&state.db)
        .summary(post_id, viewer.user())
        .await?;
    Ok(Json(ApiResponse::new(summary.into())))
}

/// POST /api/posts/:id/reactions - Toggle a reaction.
pub async fn toggle_reaction(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(post_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReactionRequest>,
) -> Result<Json<ApiResponse<ReactionToggleResponse>>, ApiError> {
    let kind: ReactionKind = req.kind.parse().map_err(ApiError::unprocessable)?;

    let service = ReactionService::new(&state.db);
    let active = service.toggle(post_id, &current.user, kind).await?;
    let summary = service.summary(post_id, Some(&current.user)).await?;

    Ok(Json(ApiResponse::new(ReactionToggleResponse {
        kind,
        active,
        summary: summary.into(),
    })))
}

/// POST /api/posts/:id/report - Report a post to the moderators.
pub async fn report_post(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(post_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReportResponse>>), ApiError> {
    let report = ModerationService::new(&state.db)
        .report_post(&current.user, post_id, &req.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(report.into()))))
}

/// GET /api/posts/:id/attachments - Files attached to a post.
pub async fn list_attachments(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<AttachmentResponse>>>, ApiError> {
    let attachments =
        AttachmentService::new(&state.db, &state.storage, &state.config.attachments)
            .list_for_post(post_id, viewer.user())
            .await?;
    Ok(Json(ApiResponse::new(
        attachments.into_iter().map(Into::into).collect(),
    )))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(ErrorCode::PayloadTooLarge, "File is too large")
    } else {
        ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// POST /api/posts/:id/attachments - Upload a file (multipart field `file`).
pub async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(post_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<AttachmentResponse>>), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(multipart_error)?;

        let attachment =
            AttachmentService::new(&state.db, &state.storage, &state.config.attachments)
                .upload(post_id, &current.user, &filename, &content)
                .await?;
        return Ok((StatusCode::CREATED, Json(ApiResponse::new(attachment.into()))));
    }
    Err(ApiError::bad_request(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}
