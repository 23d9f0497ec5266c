//! Community moderator assignments.

use super::types::CommunityModerator;
use crate::db::DbPool;
use crate::Result;

/// Repository for the `community_moderators` table.
pub struct CommunityModeratorRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> CommunityModeratorRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Make a user a moderator of a community.
    ///
    /// Returns false if the user already was one.
    pub async fn add(&self, community_id: i64, user_id: i64, added_by: Option<i64>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO community_moderators (community_id, user_id, added_by)
             VALUES (?, ?, ?)",
        )
        .bind(community_id)
        .bind(user_id)
        .bind(added_by)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a moderator assignment. Returns false if there was none.
    pub async fn remove(&self, community_id: i64, user_id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM community_moderators WHERE community_id = ? AND user_id = ?")
                .bind(community_id)
                .bind(user_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check whether a user moderates a community.
    pub async fn is_moderator(&self, community_id: i64, user_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM community_moderators WHERE community_id = ? AND user_id = ?)",
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// List the moderators of a community by username.
    pub async fn list(&self, community_id: i64) -> Result<Vec<CommunityModerator>> {
        let moderators = sqlx::query_as::<_, CommunityModerator>(
            "SELECT m.community_id, m.user_id, u.username, u.display_name, m.added_by, m.created_at
             FROM community_moderators m
             JOIN users u ON u.id = m.user_id
             WHERE m.community_id = ?
             ORDER BY u.username",
        )
        .bind(community_id)
        .fetch_all(self.pool)
        .await?;
        Ok(moderators)
    }

    /// IDs of the communities a user moderates.
    pub async fn communities_of(&self, user_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT community_id FROM community_moderators WHERE user_id = ? ORDER BY community_id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }
}
