//! Bans for Agora.
//!
//! A ban is either scoped to one community or global (`community_id` is
//! `None`). It is active while it is neither lifted nor expired.

use crate::db::DbPool;
use crate::{AgoraError, Result};

const ACTIVE: &str =
    "b.lifted_at IS NULL AND (b.expires_at IS NULL OR b.expires_at > datetime('now'))";

const BAN_SELECT: &str = "SELECT b.id, b.user_id, u.username, b.community_id, b.reason, b.banned_by,
        b.expires_at, b.lifted_at, b.created_at
     FROM bans b
     JOIN users u ON u.id = b.user_id";

/// A ban record.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Ban {
    /// Unique ban ID.
    pub id: i64,
    /// Banned user.
    pub user_id: i64,
    /// Banned user's username.
    pub username: String,
    /// Community the ban applies to, or None for a global ban.
    pub community_id: Option<i64>,
    /// Reason shown to the user.
    pub reason: String,
    /// Moderator who issued the ban.
    pub banned_by: Option<i64>,
    /// Expiry, or None for a permanent ban.
    pub expires_at: Option<String>,
    /// When the ban was lifted early.
    pub lifted_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

impl Ban {
    /// Whether this is a global ban.
    pub fn is_global(&self) -> bool {
        self.community_id.is_none()
    }
}

/// Data for a new ban.
#[derive(Debug, Clone)]
pub struct NewBan {
    /// User to ban.
    pub user_id: i64,
    /// Community scope, or None for global.
    pub community_id: Option<i64>,
    /// Reason.
    pub reason: String,
    /// Issuer.
    pub banned_by: Option<i64>,
    /// Expiry in database format, or None for permanent.
    pub expires_at: Option<String>,
}

/// Repository for bans.
pub struct BanRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> BanRepository<'a> {
    /// Create a new BanRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Record a ban.
    pub async fn create(&self, ban: &NewBan) -> Result<Ban> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO bans (user_id, community_id, reason, banned_by, expires_at)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(ban.user_id)
        .bind(ban.community_id)
        .bind(&ban.reason)
        .bind(ban.banned_by)
        .bind(&ban.expires_at)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("ban".to_string()))
    }

    /// Get a ban by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Ban>> {
        let sql = format!("{BAN_SELECT} WHERE b.id = ?");
        let ban = sqlx::query_as::<_, Ban>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(ban)
    }

    /// Find the newest active ban covering a user.
    ///
    /// With `community_id` set, both global bans and bans for that community
    /// match. Without it, only global bans do.
    pub async fn find_active(&self, user_id: i64, community_id: Option<i64>) -> Result<Option<Ban>> {
        let sql = format!(
            "{BAN_SELECT} WHERE b.user_id = ? AND {ACTIVE}
               AND (b.community_id IS NULL OR b.community_id = ?)
             ORDER BY b.created_at DESC, b.id DESC
             LIMIT 1"
        );
        let ban = sqlx::query_as::<_, Ban>(&sql)
            .bind(user_id)
            .bind(community_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(ban)
    }

    /// List active bans of one community, or the active global bans when `None`.
    pub async fn list_active(&self, community_id: Option<i64>) -> Result<Vec<Ban>> {
        let sql = format!(
            "{BAN_SELECT} WHERE {ACTIVE} AND b.community_id IS ?
             ORDER BY b.created_at DESC, b.id DESC"
        );
        let bans = sqlx::query_as::<_, Ban>(&sql)
            .bind(community_id)
            .fetch_all(self.pool)
            .await?;
        Ok(bans)
    }

    /// Lift an active ban. Returns false if it was missing or no longer active.
    pub async fn lift(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE bans SET lifted_at = datetime('now')
             WHERE id = ? AND lifted_at IS NULL
               AND (expires_at IS NULL OR expires_at > datetime('now'))",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::{CommunityRepository, NewCommunity};
    use crate::datetime::sql_datetime_after_secs;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        let admin = users
            .create(&NewUser::new("boss", "h", "Boss"))
            .await
            .unwrap();
        let troll = users
            .create(&NewUser::new("troll", "h", "Troll"))
            .await
            .unwrap();
        let community = CommunityRepository::new(db.pool())
            .create(&NewCommunity::new("rust", "Rust"))
            .await
            .unwrap();
        (db, admin.id, troll.id, community.id)
    }

    fn ban(user_id: i64, community_id: Option<i64>, expires_at: Option<String>) -> NewBan {
        NewBan {
            user_id,
            community_id,
            reason: "spam".to_string(),
            banned_by: None,
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_community_ban_scope() {
        let (db, _, troll, community) = setup().await;
        let repo = BanRepository::new(db.pool());

        let created = repo.create(&ban(troll, Some(community), None)).await.unwrap();
        assert_eq!(created.username, "troll");
        assert!(!created.is_global());

        assert!(repo.find_active(troll, Some(community)).await.unwrap().is_some());
        assert!(repo.find_active(troll, Some(community + 1)).await.unwrap().is_none());
        assert!(repo.find_active(troll, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_global_ban_covers_everything() {
        let (db, _, troll, community) = setup().await;
        let repo = BanRepository::new(db.pool());
        repo.create(&ban(troll, None, None)).await.unwrap();

        assert!(repo.find_active(troll, None).await.unwrap().is_some());
        assert!(repo.find_active(troll, Some(community)).await.unwrap().is_some());
        assert_eq!(repo.list_active(None).await.unwrap().len(), 1);
        assert!(repo.list_active(Some(community)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_and_lifted_bans_are_inactive() {
        let (db, admin, troll, community) = setup().await;
        let repo = BanRepository::new(db.pool());

        let expired = repo
            .create(&ban(troll, Some(community), Some(sql_datetime_after_secs(-60).unwrap())))
            .await
            .unwrap();
        assert!(repo.find_active(troll, Some(community)).await.unwrap().is_none());
        assert!(!repo.lift(expired.id).await.unwrap());

        let live = repo
            .create(&ban(admin, Some(community), Some(sql_datetime_after_secs(3600).unwrap())))
            .await
            .unwrap();
        assert_eq!(repo.list_active(Some(community)).await.unwrap().len(), 1);
        assert!(repo.lift(live.id).await.unwrap());
        assert!(!repo.lift(live.id).await.unwrap());
        assert!(repo.find_active(admin, Some(community)).await.unwrap().is_none());
        assert!(repo.get_by_id(live.id).await.unwrap().unwrap().lifted_at.is_some());
    }
}
