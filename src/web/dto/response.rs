//! Response DTOs.

use serde::Serialize;

use crate::attachment::Attachment;
use crate::auth::CommunityAccess;
use crate::community::{Board, Category, Community, CommunityModerator, CommunityOverview};
use crate::db::{Role, User};
use crate::forum::{PaginatedResult, Post, Thread};
use crate::moderation::{Ban, ModLogEntry, Report, ReportStatus};
use crate::notification::{Notification, NotificationKind};
use crate::reaction::{ReactionKind, ReactionSummary};
use crate::search::SearchHit;

// ============================================================================
// Envelopes
// ============================================================================

/// `{"data": ...}` envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// `{"data": [...], "meta": {...}}` envelope for paged lists.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T: Serialize> PaginatedResponse<T> {
    /// Convert a service result, mapping each item to its DTO.
    pub fn from_result<U>(result: PaginatedResult<U>, f: impl FnMut(U) -> T) -> Self {
        let meta = PaginationMeta {
            page: result.page(),
            per_page: result.limit,
            total: result.total,
        };
        Self {
            data: result.items.into_iter().map(f).collect(),
            meta,
        }
    }
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Generic acknowledgement for actions without a resource to return.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

// ============================================================================
// Users and sessions
// ============================================================================

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub post_count: i64,
    pub is_active: bool,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            post_count: user.post_count,
            is_active: user.is_active,
            created_at: user.created_at.clone(),
        }
    }
}

/// The caller's own account (for `/auth/me`).
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub post_count: i64,
    pub unread_notifications: i64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl MeResponse {
    pub fn new(user: &User, unread_notifications: i64) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            email: user.email.clone(),
            profile: user.profile.clone(),
            signature: user.signature.clone(),
            post_count: user.post_count,
            unread_notifications,
            created_at: user.created_at.clone(),
            last_login: user.last_login.clone(),
        }
    }
}

/// Login response. The token is also set as a cookie.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    /// Session lifetime in seconds.
    pub expires_in: i64,
    pub user: MeResponse,
}

// ============================================================================
// Communities
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CommunityResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
}

impl From<Community> for CommunityResponse {
    fn from(c: Community) -> Self {
        Self {
            id: c.id,
            slug: c.slug,
            name: c.name,
            description: c.description,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub community_id: i64,
    pub name: String,
    pub sort_order: i32,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            community_id: c.community_id,
            name: c.name,
            sort_order: c.sort_order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub id: i64,
    pub community_id: i64,
    pub category_id: i64,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sort_order: i32,
    pub min_read_role: Role,
    pub min_write_role: Role,
    pub thread_count: i64,
    pub post_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_post_at: Option<String>,
    pub created_at: String,
}

impl From<Board> for BoardResponse {
    fn from(b: Board) -> Self {
        Self {
            id: b.id,
            community_id: b.community_id,
            category_id: b.category_id,
            slug: b.slug,
            name: b.name,
            description: b.description,
            sort_order: b.sort_order,
            min_read_role: b.min_read_role,
            min_write_role: b.min_write_role,
            thread_count: b.thread_count,
            post_count: b.post_count,
            last_post_at: b.last_post_at,
            created_at: b.created_at,
        }
    }
}

/// What the caller may do in a community.
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub role: Role,
    pub is_moderator: bool,
    pub is_banned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_reason: Option<String>,
}

impl From<&CommunityAccess> for AccessResponse {
    fn from(access: &CommunityAccess) -> Self {
        Self {
            role: access.role,
            is_moderator: access.is_moderator(),
            is_banned: access.is_banned(),
            ban_reason: access.ban_reason.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryWithBoardsResponse {
    #[serde(flatten)]
    pub category: CategoryResponse,
    pub boards: Vec<BoardResponse>,
}

/// A community with its visible categories and boards.
#[derive(Debug, Serialize)]
pub struct CommunityOverviewResponse {
    #[serde(flatten)]
    pub community: CommunityResponse,
    pub access: AccessResponse,
    pub categories: Vec<CategoryWithBoardsResponse>,
}

impl From<CommunityOverview> for CommunityOverviewResponse {
    fn from(overview: CommunityOverview) -> Self {
        Self {
            access: AccessResponse::from(&overview.access),
            community: overview.community.into(),
            categories: overview
                .categories
                .into_iter()
                .map(|c| CategoryWithBoardsResponse {
                    category: c.category.into(),
                    boards: c.boards.into_iter().map(Into::into).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModeratorResponse {
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_by: Option<i64>,
    pub created_at: String,
}

impl From<CommunityModerator> for ModeratorResponse {
    fn from(m: CommunityModerator) -> Self {
        Self {
            user_id: m.user_id,
            username: m.username,
            display_name: m.display_name,
            added_by: m.added_by,
            created_at: m.created_at,
        }
    }
}

// ============================================================================
// Threads and posts
// ============================================================================

/// Author of a thread or post.
#[derive(Debug, Serialize)]
pub struct AuthorInfo {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub author: AuthorInfo,
    pub is_locked: bool,
    pub is_sticky: bool,
    pub post_count: i64,
    pub view_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_post_id: Option<i64>,
    pub last_post_at: String,
    pub created_at: String,
}

impl From<Thread> for ThreadResponse {
    fn from(t: Thread) -> Self {
        Self {
            id: t.id,
            board_id: t.board_id,
            title: t.title,
            author: AuthorInfo {
                id: t.author_id,
                username: t.author_username,
                display_name: t.author_display_name,
            },
            is_locked: t.is_locked,
            is_sticky: t.is_sticky,
            post_count: t.post_count,
            view_count: t.view_count,
            last_post_id: t.last_post_id,
            last_post_at: t.last_post_at,
            created_at: t.created_at,
        }
    }
}

/// A post. `body` is the BBCode source, `body_html` the rendered form.
/// Deleted posts keep their slot with empty bodies.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub thread_id: i64,
    pub author: AuthorInfo,
    pub body: String,
    pub body_html: String,
    pub is_deleted: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_by: Option<i64>,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            thread_id: p.thread_id,
            author: AuthorInfo {
                id: p.author_id,
                username: p.author_username,
                display_name: p.author_display_name,
            },
            body: p.body_raw,
            body_html: p.body_html,
            is_deleted: p.is_deleted,
            created_at: p.created_at,
            edited_at: p.edited_at,
            edited_by: p.edited_by,
        }
    }
}

/// Thread page header: the thread, its board, and what the caller may do.
#[derive(Debug, Serialize)]
pub struct ThreadDetailResponse {
    pub thread: ThreadResponse,
    pub board: BoardResponse,
    pub can_reply: bool,
    pub can_moderate: bool,
}

/// Response to thread creation.
#[derive(Debug, Serialize)]
pub struct CreatedThreadResponse {
    pub thread: ThreadResponse,
    pub post: PostResponse,
}

// ============================================================================
// Reactions and attachments
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ReactionCount {
    pub kind: ReactionKind,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct ReactionSummaryResponse {
    pub counts: Vec<ReactionCount>,
    pub mine: Vec<ReactionKind>,
}

impl From<ReactionSummary> for ReactionSummaryResponse {
    fn from(s: ReactionSummary) -> Self {
        Self {
            counts: s
                .counts
                .into_iter()
                .map(|(kind, count)| ReactionCount { kind, count })
                .collect(),
            mine: s.mine,
        }
    }
}

/// Result of toggling a reaction.
#[derive(Debug, Serialize)]
pub struct ReactionToggleResponse {
    pub kind: ReactionKind,
    /// True if the reaction was added, false if removed.
    pub active: bool,
    pub summary: ReactionSummaryResponse,
}

#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub id: i64,
    pub post_id: i64,
    pub uploader_id: i64,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub download_count: i64,
    pub url: String,
    pub created_at: String,
}

impl From<Attachment> for AttachmentResponse {
    fn from(a: Attachment) -> Self {
        Self {
            url: format!("/api/attachments/{}", a.id),
            id: a.id,
            post_id: a.post_id,
            uploader_id: a.uploader_id,
            filename: a.original_name,
            mime_type: a.mime_type,
            size: a.size,
            download_count: a.download_count,
            created_at: a.created_at,
        }
    }
}

// ============================================================================
// Moderation
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub id: i64,
    pub post_id: i64,
    pub thread_id: i64,
    pub community_id: i64,
    pub reporter_id: i64,
    pub reporter_username: String,
    pub reason: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handled_by: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handled_at: Option<String>,
    pub created_at: String,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            post_id: r.post_id,
            thread_id: r.thread_id,
            community_id: r.community_id,
            reporter_id: r.reporter_id,
            reporter_username: r.reporter_username,
            reason: r.reason,
            status: r.status,
            handled_by: r.handled_by,
            handled_at: r.handled_at,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BanResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    /// None for a site-wide ban.
    pub community_id: Option<i64>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned_by: Option<i64>,
    /// None for a permanent ban.
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifted_at: Option<String>,
    pub created_at: String,
}

impl From<Ban> for BanResponse {
    fn from(b: Ban) -> Self {
        Self {
            id: b.id,
            user_id: b.user_id,
            username: b.username,
            community_id: b.community_id,
            reason: b.reason,
            banned_by: b.banned_by,
            expires_at: b.expires_at,
            lifted_at: b.lifted_at,
            created_at: b.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModLogResponse {
    pub id: i64,
    pub community_id: Option<i64>,
    pub moderator_id: Option<i64>,
    pub moderator_username: Option<String>,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub created_at: String,
}

impl From<ModLogEntry> for ModLogResponse {
    fn from(e: ModLogEntry) -> Self {
        Self {
            id: e.id,
            community_id: e.community_id,
            moderator_id: e.moderator_id,
            moderator_username: e.moderator_username,
            action: e.action,
            target_type: e.target_type,
            target_id: e.target_id,
            details: e.details,
            created_at: e.created_at,
        }
    }
}

// ============================================================================
// Notifications, search, preview
// ============================================================================

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: i64,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            actor_id: n.actor_id,
            actor_username: n.actor_username,
            thread_id: n.thread_id,
            post_id: n.post_id,
            message: n.message,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

/// Number of notifications affected by a bulk action.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct SearchHitResponse {
    pub post_id: i64,
    pub thread_id: i64,
    pub thread_title: String,
    pub board_id: i64,
    pub community_id: i64,
    pub author_username: String,
    /// HTML-escaped excerpt with matches wrapped in `<mark>`.
    pub snippet: String,
    pub created_at: String,
}

impl From<SearchHit> for SearchHitResponse {
    fn from(h: SearchHit) -> Self {
        Self {
            post_id: h.post_id,
            thread_id: h.thread_id,
            thread_title: h.thread_title,
            board_id: h.board_id,
            community_id: h.community_id,
            author_username: h.author_username,
            snippet: h.snippet,
            created_at: h.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
}
