//! Moderation handlers: reports, bans and the moderation log.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::community::CommunityService;
use crate::forum::Pagination;
use crate::moderation::{BanRequest, ModerationService, ReportStatus};
use crate::web::dto::{
    ApiResponse, BanResponse, BanUserRequest, ModLogResponse, PaginatedResponse,
    PaginationQuery, ReportListQuery, ReportResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

const DEFAULT_PER_PAGE: u32 = 25;

async fn community_id(state: &AppState, slug: &str) -> Result<i64, ApiError> {
    Ok(CommunityService::new(&state.db).get_community(slug).await?.id)
}

/// GET /api/communities/:slug/reports?status= - Reports of a community.
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(slug): Path<String>,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<PaginatedResponse<ReportResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ReportStatus>)
        .transpose()
        .map_err(ApiError::bad_request)?;
    let pagination = Pagination::page(
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    );

    let community_id = community_id(&state, &slug).await?;
    let reports = ModerationService::new(&state.db)
        .list_reports(&current.user, community_id, status, pagination)
        .await?;
    Ok(Json(PaginatedResponse::from_result(reports, Into::into)))
}

/// POST /api/reports/:id/resolve
pub async fn resolve_report(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(report_id): Path<i64>,
) -> Result<Json<ApiResponse<ReportResponse>>, ApiError> {
    let report = ModerationService::new(&state.db)
        .resolve_report(&current.user, report_id)
        .await?;
    Ok(Json(ApiResponse::new(report.into())))
}

/// POST /api/reports/:id/dismiss
pub async fn dismiss_report(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(report_id): Path<i64>,
) -> Result<Json<ApiResponse<ReportResponse>>, ApiError> {
    let report = ModerationService::new(&state.db)
        .dismiss_report(&current.user, report_id)
        .await?;
    Ok(Json(ApiResponse::new(report.into())))
}

/// GET /api/communities/:slug/bans - Active bans of a community.
pub async fn list_bans(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<BanResponse>>>, ApiError> {
    let community_id = community_id(&state, &slug).await?;
    let bans = ModerationService::new(&state.db)
        .list_bans(&current.user, Some(community_id))
        .await?;
    Ok(Json(ApiResponse::new(bans.into_iter().map(Into::into).collect())))
}

async fn ban(
    state: &AppState,
    current: &CurrentUser,
    community_id: Option<i64>,
    req: BanUserRequest,
) -> Result<(StatusCode, Json<ApiResponse<BanResponse>>), ApiError> {
    let ban = ModerationService::new(&state.db)
        .ban_user(
            &current.user,
            &BanRequest {
                user_id: req.user_id,
                community_id,
                reason: req.reason,
                duration_secs: req.duration_secs,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(ban.into()))))
}

/// POST /api/communities/:slug/bans - Ban a user from a community.
pub async fn ban_in_community(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(slug): Path<String>,
    ValidatedJson(req): ValidatedJson<BanUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BanResponse>>), ApiError> {
    let community_id = community_id(&state, &slug).await?;
    ban(&state, &current, Some(community_id), req).await
}

/// POST /api/admin/bans - Ban a user site-wide, or from the community in the
/// body (admin).
pub async fn admin_ban(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<BanUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BanResponse>>), ApiError> {
    let community_id = req.community_id;
    ban(&state, &current, community_id, req).await
}

/// GET /api/admin/bans - Active site-wide bans (admin).
pub async fn list_global_bans(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<Vec<BanResponse>>>, ApiError> {
    let bans = ModerationService::new(&state.db)
        .list_bans(&current.user, None)
        .await?;
    Ok(Json(ApiResponse::new(bans.into_iter().map(Into::into).collect())))
}

/// DELETE /api/bans/:id - Lift a ban early.
pub async fn lift_ban(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(ban_id): Path<i64>,
) -> Result<Json<ApiResponse<BanResponse>>, ApiError> {
    let ban = ModerationService::new(&state.db)
        .lift_ban(&current.user, ban_id)
        .await?;
    Ok(Json(ApiResponse::new(ban.into())))
}

/// GET /api/communities/:slug/modlog - Moderation log of a community.
pub async fn community_mod_log(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(slug): Path<String>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<ModLogResponse>>, ApiError> {
    let community_id = community_id(&state, &slug).await?;
    let entries = ModerationService::new(&state.db)
        .mod_log(
            &current.user,
            Some(community_id),
            Pagination::page(pagination.page(), pagination.per_page(DEFAULT_PER_PAGE)),
        )
        .await?;
    Ok(Json(PaginatedResponse::from_result(entries, Into::into)))
}

/// GET /api/admin/modlog - Site-wide moderation log (admin).
pub async fn site_mod_log(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<ModLogResponse>>, ApiError> {
    let entries = ModerationService::new(&state.db)
        .mod_log(
            &current.user,
            None,
            Pagination::page(pagination.page(), pagination.per_page(DEFAULT_PER_PAGE)),
        )
        .await?;
    Ok(Json(PaginatedResponse::from_result(entries, Into::into)))
}
