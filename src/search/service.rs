//! Full-text search over posts.

use std::collections::{HashMap, HashSet};

use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use super::query::build_match_query;
use crate::auth::resolve_access;
use crate::bbcode::escape_html;
use crate::community::{BoardRepository, CommunityRepository};
use crate::config::SearchConfig;
use crate::db::{Database, User};
use crate::forum::{PaginatedResult, Pagination};
use crate::{AgoraError, Result};

const MARK_OPEN: char = '\u{E000}';
const MARK_CLOSE: char = '\u{E001}';
/// Tokens of context in a snippet.
const SNIPPET_TOKENS: i32 = 24;

/// What to search for.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Raw user input.
    pub text: String,
    /// Restrict to one community.
    pub community_id: Option<i64>,
    /// Restrict to one board.
    pub board_id: Option<i64>,
}

impl SearchQuery {
    /// Search everywhere for `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Restrict to a community.
    pub fn in_community(mut self, community_id: i64) -> Self {
        self.community_id = Some(community_id);
        self
    }

    /// Restrict to a board.
    pub fn in_board(mut self, board_id: i64) -> Self {
        self.board_id = Some(board_id);
        self
    }
}

/// One matching post.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchHit {
    pub post_id: i64,
    pub thread_id: i64,
    pub thread_title: String,
    pub board_id: i64,
    pub community_id: i64,
    pub author_username: String,
    /// HTML-escaped excerpt with matches wrapped in `<mark>`.
    pub snippet: String,
    /// bm25 score; lower is better.
    pub rank: f64,
    pub created_at: String,
}

/// Service for searching posts.
pub struct SearchService<'a> {
    db: &'a Database,
    config: &'a SearchConfig,
}

impl<'a> SearchService<'a> {
    /// Create a new SearchService.
    pub fn new(db: &'a Database, config: &'a SearchConfig) -> Self {
        Self { db, config }
    }

    /// Search posts the viewer can read, best matches first.
    ///
    /// Up to `max_candidates` ranked matches are fetched, then filtered by
    /// board read access and paged.
    pub async fn search(
        &self,
        query: &SearchQuery,
        viewer: Option<&User>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<SearchHit>> {
        let expr = build_match_query(&query.text)?;
        let pool = self.db.pool();

        if let Some(community_id) = query.community_id {
            CommunityRepository::new(pool)
                .get_by_id(community_id)
                .await?
                .ok_or_else(|| AgoraError::NotFound("community".to_string()))?;
        }
        if let Some(board_id) = query.board_id {
            BoardRepository::new(pool)
                .get_by_id(board_id)
                .await?
                .ok_or_else(|| AgoraError::NotFound("board".to_string()))?;
        }

        let readable = self.readable_boards(viewer, query.community_id).await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT p.id AS post_id, p.thread_id, t.title AS thread_title, t.board_id,
                    b.community_id, u.username AS author_username,
                    snippet(posts_fts, 1, ",
        );
        builder
            .push_bind(MARK_OPEN.to_string())
            .push(", ")
            .push_bind(MARK_CLOSE.to_string())
            .push(", '…', ")
            .push_bind(SNIPPET_TOKENS)
            .push(
                ") AS snippet, bm25(posts_fts) AS rank, p.created_at
             FROM posts_fts
             JOIN posts p ON p.id = posts_fts.rowid
             JOIN threads t ON t.id = p.thread_id
             JOIN boards b ON b.id = t.board_id
             JOIN users u ON u.id = p.author_id
             WHERE posts_fts MATCH ",
            )
            .push_bind(expr)
            .push(" AND p.is_deleted = 0");
        if let Some(community_id) = query.community_id {
            builder.push(" AND b.community_id = ").push_bind(community_id);
        }
        if let Some(board_id) = query.board_id {
            builder.push(" AND t.board_id = ").push_bind(board_id);
        }
        builder
            .push(" ORDER BY rank, p.id DESC LIMIT ")
            .push_bind(self.config.max_candidates);

        let candidates: Vec<SearchHit> = builder.build_query_as().fetch_all(pool).await?;
        let candidate_count = candidates.len();

        let visible: Vec<SearchHit> = candidates
            .into_iter()
            .filter(|hit| readable.contains(&hit.board_id))
            .collect();
        let total = visible.len() as i64;
        let items = visible
            .into_iter()
            .skip(pagination.offset.max(0) as usize)
            .take(pagination.limit.max(0) as usize)
            .map(|mut hit| {
                hit.snippet = highlight(&hit.snippet);
                hit
            })
            .collect();

        debug!(
            candidates = candidate_count,
            visible = total,
            "Search completed"
        );
        Ok(PaginatedResult::new(items, total, pagination))
    }

    /// IDs of boards the viewer can read, resolving access once per community.
    async fn readable_boards(
        &self,
        viewer: Option<&User>,
        community_id: Option<i64>,
    ) -> Result<HashSet<i64>> {
        let pool = self.db.pool();
        let repo = BoardRepository::new(pool);
        let boards = match community_id {
            Some(id) => repo.list_by_community(id).await?,
            None => repo.list_all().await?,
        };

        let mut access_by_community = HashMap::new();
        let mut readable = HashSet::new();
        for board in boards {
            if !access_by_community.contains_key(&board.community_id) {
                let access = resolve_access(pool, viewer, board.community_id).await?;
                access_by_community.insert(board.community_id, access);
            }
            if access_by_community
                .get(&board.community_id)
                .is_some_and(|access| access.can_read_board(&board))
            {
                readable.insert(board.id);
            }
        }
        Ok(readable)
    }
}

/// Escape a raw snippet and turn the match markers into `<mark>` tags.
fn highlight(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 16);
    let mut open = false;
    let mut text = String::new();

    for c in raw.chars() {
        match c {
            MARK_OPEN if !open => {
                out.push_str(&escape_html(&text));
                text.clear();
                out.push_str("<mark>");
                open = true;
            }
            MARK_CLOSE if open => {
                out.push_str(&escape_html(&text));
                text.clear();
                out.push_str("</mark>");
                open = false;
            }
            MARK_OPEN | MARK_CLOSE => {}
            _ => text.push(c),
        }
    }
    out.push_str(&escape_html(&text));
    if open {
        out.push_str("</mark>");
    }
    out
}
