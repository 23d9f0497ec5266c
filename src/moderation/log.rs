//! Moderation log.

use crate::db::DbPool;
use crate::Result;

/// An entry in the moderation log.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ModLogEntry {
    /// Unique entry ID.
    pub id: i64,
    /// Community the action happened in, or None for site-wide actions.
    pub community_id: Option<i64>,
    /// Acting moderator.
    pub moderator_id: Option<i64>,
    /// Acting moderator's username, if the account still exists.
    pub moderator_username: Option<String>,
    /// Action name, e.g. `lock_thread`.
    pub action: String,
    /// Kind of target: `user`, `thread`, `post`, `ban` or `report`.
    pub target_type: String,
    /// Target ID.
    pub target_id: i64,
    /// Free-form details.
    pub details: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// Data for a new log entry.
#[derive(Debug, Clone)]
pub struct NewModLogEntry {
    pub community_id: Option<i64>,
    pub moderator_id: i64,
    pub action: String,
    pub target_type: &'static str,
    pub target_id: i64,
    pub details: Option<String>,
}

impl NewModLogEntry {
    /// Create a log entry.
    pub fn new(
        community_id: Option<i64>,
        moderator_id: i64,
        action: impl Into<String>,
        target_type: &'static str,
        target_id: i64,
        details: Option<String>,
    ) -> Self {
        Self {
            community_id,
            moderator_id,
            action: action.into(),
            target_type,
            target_id,
            details,
        }
    }

    /// An action on a user.
    pub fn user_action(
        community_id: Option<i64>,
        moderator_id: i64,
        action: impl Into<String>,
        user_id: i64,
        details: Option<String>,
    ) -> Self {
        Self::new(community_id, moderator_id, action, "user", user_id, details)
    }

    /// An action on a thread.
    pub fn thread_action(
        community_id: Option<i64>,
        moderator_id: i64,
        action: impl Into<String>,
        thread_id: i64,
        details: Option<String>,
    ) -> Self {
        Self::new(community_id, moderator_id, action, "thread", thread_id, details)
    }

    /// An action on a post.
    pub fn post_action(
        community_id: Option<i64>,
        moderator_id: i64,
        action: impl Into<String>,
        post_id: i64,
        details: Option<String>,
    ) -> Self {
        Self::new(community_id, moderator_id, action, "post", post_id, details)
    }
}

const LOG_SELECT: &str = "SELECT l.id, l.community_id, l.moderator_id, u.username AS moderator_username,
        l.action, l.target_type, l.target_id, l.details, l.created_at
     FROM moderation_log l
     LEFT JOIN users u ON u.id = l.moderator_id";

/// Repository for the moderation log.
pub struct ModLogRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ModLogRepository<'a> {
    /// Create a new ModLogRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    pub async fn append(&self, entry: &NewModLogEntry) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO moderation_log (community_id, moderator_id, action, target_type, target_id, details)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(entry.community_id)
        .bind(entry.moderator_id)
        .bind(&entry.action)
        .bind(entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.details)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(
            log_id = id,
            action = %entry.action,
            target_type = entry.target_type,
            target_id = entry.target_id,
            "Moderation action logged"
        );
        Ok(id)
    }

    /// List entries for a community, newest first. `None` lists site-wide entries.
    pub async fn list_by_community(
        &self,
        community_id: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ModLogEntry>> {
        let sql = format!(
            "{LOG_SELECT} WHERE l.community_id IS ?
             ORDER BY l.created_at DESC, l.id DESC
             LIMIT ? OFFSET ?"
        );
        let entries = sqlx::query_as::<_, ModLogEntry>(&sql)
            .bind(community_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(entries)
    }

    /// Count entries for a community. `None` counts site-wide entries.
    pub async fn count_by_community(&self, community_id: Option<i64>) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM moderation_log WHERE community_id IS ?")
                .bind(community_id)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}
