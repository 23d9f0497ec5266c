//! Login session repository.
//!
//! Only the SHA-256 digest of a session token is ever written here.

use super::DbPool;
use crate::{AgoraError, Result};

const SQL_NOW: &str = "datetime('now')";

/// Stored login session.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    /// Session ID.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Hex SHA-256 digest of the session token.
    pub token_hash: String,
    /// Client IP address at login.
    pub ip_address: Option<String>,
    /// Client user agent at login.
    pub user_agent: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last time the session was used.
    pub last_seen_at: String,
    /// Expiration timestamp.
    pub expires_at: String,
}

/// New session for creation.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Owning user.
    pub user_id: i64,
    /// Hex SHA-256 digest of the session token.
    pub token_hash: String,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Expiration timestamp.
    pub expires_at: String,
}

/// Repository for session operations.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new session.
    pub async fn create(&self, new_session: &NewSession) -> Result<SessionRecord> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sessions (user_id, token_hash, ip_address, user_agent, expires_at)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(new_session.user_id)
        .bind(&new_session.token_hash)
        .bind(&new_session.ip_address)
        .bind(&new_session.user_agent)
        .bind(&new_session.expires_at)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("session".into()))
    }

    /// Get a session by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, token_hash, ip_address, user_agent, created_at, last_seen_at, expires_at
             FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    /// Get an unexpired session by token digest.
    pub async fn get_valid_by_hash(&self, token_hash: &str) -> Result<Option<SessionRecord>> {
        let sql = format!(
            "SELECT id, user_id, token_hash, ip_address, user_agent, created_at, last_seen_at, expires_at
             FROM sessions
             WHERE token_hash = ? AND expires_at > {SQL_NOW}"
        );
        let session = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(token_hash)
            .fetch_optional(self.pool)
            .await?;

        Ok(session)
    }

    /// Record activity on a session.
    pub async fn touch(&self, id: i64) -> Result<()> {
        let sql = format!("UPDATE sessions SET last_seen_at = {SQL_NOW} WHERE id = ?");
        sqlx::query(&sql).bind(id).execute(self.pool).await?;
        Ok(())
    }

    /// Delete a session by token digest.
    pub async fn delete_by_hash(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete all sessions of a user.
    pub async fn delete_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete all sessions of a user except one.
    pub async fn delete_others_for_user(&self, user_id: i64, keep_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND id != ?")
            .bind(user_id)
            .bind(keep_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete expired sessions.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let sql = format!("DELETE FROM sessions WHERE expires_at <= {SQL_NOW}");
        let result = sqlx::query(&sql).execute(self.pool).await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO users (username, password, display_name) VALUES (?, ?, ?)")
            .bind("testuser")
            .bind("hashedpassword")
            .bind("Test User")
            .execute(db.pool())
            .await
            .unwrap();
        db
    }

    fn new_session(hash: &str, expires_at: &str) -> NewSession {
        NewSession {
            user_id: 1,
            token_hash: hash.to_string(),
            ip_address: Some("127.0.0.1".to_string()),
            user_agent: None,
            expires_at: expires_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_session() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        let session = repo
            .create(&new_session("abc", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        assert_eq!(session.user_id, 1);
        assert_eq!(session.token_hash, "abc");
        assert_eq!(session.ip_address.as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_get_valid_by_hash_skips_expired() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&new_session("valid", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.create(&new_session("expired", "2000-01-01 00:00:00"))
            .await
            .unwrap();

        assert!(repo.get_valid_by_hash("valid").await.unwrap().is_some());
        assert!(repo.get_valid_by_hash("expired").await.unwrap().is_none());
        assert!(repo.get_valid_by_hash("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_hash() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&new_session("bye", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        assert!(repo.delete_by_hash("bye").await.unwrap());
        assert!(!repo.delete_by_hash("bye").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_for_user_and_others() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        let keep = repo
            .create(&new_session("s0", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        for i in 1..3 {
            repo.create(&new_session(&format!("s{i}"), "2099-12-31 23:59:59"))
                .await
                .unwrap();
        }

        assert_eq!(repo.delete_others_for_user(1, keep.id).await.unwrap(), 2);
        assert!(repo.get_valid_by_hash("s0").await.unwrap().is_some());
        assert_eq!(repo.delete_for_user(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&new_session("old", "2000-01-01 00:00:00"))
            .await
            .unwrap();
        repo.create(&new_session("new", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert_eq!(repo.cleanup_expired().await.unwrap(), 1);
        assert!(repo.get_valid_by_hash("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_touch_updates_last_seen() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        let session = repo
            .create(&new_session("t", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        sqlx::query("UPDATE sessions SET last_seen_at = '2000-01-01 00:00:00' WHERE id = ?")
            .bind(session.id)
            .execute(db.pool())
            .await
            .unwrap();

        repo.touch(session.id).await.unwrap();
        let session = repo.get_by_id(session.id).await.unwrap().unwrap();
        assert_ne!(session.last_seen_at, "2000-01-01 00:00:00");
    }
}
