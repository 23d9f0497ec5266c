//! Full-text search handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::community::CommunityService;
use crate::forum::Pagination;
use crate::search::{SearchQuery, SearchService};
use crate::web::dto::{PaginatedResponse, SearchHitResponse, SearchParams};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::MaybeUser;

/// GET /api/search?q=&community=&board= - Search posts the caller can read.
pub async fn search(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<PaginatedResponse<SearchHitResponse>>, ApiError> {
    let mut query = SearchQuery::new(params.q);
    if let Some(slug) = params.community.as_deref() {
        let community = CommunityService::new(&state.db).get_community(slug).await?;
        query = query.in_community(community.id);
    }
    if let Some(board_id) = params.board {
        query = query.in_board(board_id);
    }

    let pagination = Pagination::page(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(state.config.search.default_limit),
    );
    let hits = SearchService::new(&state.db, &state.config.search)
        .search(&query, viewer.user(), pagination)
        .await?;
    Ok(Json(PaginatedResponse::from_result(hits, Into::into)))
}
