//! User repository for Agora.
//!
//! This module provides CRUD operations for users in the database.

use sqlx::{QueryBuilder, Sqlite};

use super::user::{NewUser, Role, User, UserUpdate};
use super::DbPool;
use crate::{AgoraError, Result};

const USER_COLUMNS: &str = "id, username, password, display_name, email, role, profile, signature,
                            post_count, is_active, created_at, last_login";

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, password, display_name, email, role)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(&new_user.display_name)
        .bind(&new_user.email)
        .bind(new_user.role.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                AgoraError::Conflict("username already exists".to_string())
            } else {
                AgoraError::Database(e.to_string())
            }
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(UserRow::into_user))
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(UserRow::into_user))
    }

    /// Get all active users whose username is in the given list (case-insensitive).
    pub async fn get_active_by_usernames(&self, usernames: &[String]) -> Result<Vec<User>> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 AND lower(username) IN ("
        ));
        let mut separated = query.separated(", ");
        for name in usernames {
            separated.push_bind(name.to_lowercase());
        }
        separated.push_unseparated(")");

        let rows: Vec<UserRow> = query.build_query_as().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    /// Update a user by ID.
    ///
    /// Only fields that are set in the update will be modified.
    /// Returns the updated user, or None if not found.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query.separated(", ");

        if let Some(ref password) = update.password {
            separated.push("password = ");
            separated.push_bind_unseparated(password);
        }
        if let Some(ref display_name) = update.display_name {
            separated.push("display_name = ");
            separated.push_bind_unseparated(display_name);
        }
        if let Some(ref email) = update.email {
            separated.push("email = ");
            separated.push_bind_unseparated(email.clone());
        }
        if let Some(role) = update.role {
            separated.push("role = ");
            separated.push_bind_unseparated(role.as_str());
        }
        if let Some(ref profile) = update.profile {
            separated.push("profile = ");
            separated.push_bind_unseparated(profile.clone());
        }
        if let Some(ref signature) = update.signature {
            separated.push("signature = ");
            separated.push_bind_unseparated(signature.clone());
        }
        if let Some(is_active) = update.is_active {
            separated.push("is_active = ");
            separated.push_bind_unseparated(is_active);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Update the last login timestamp for a user.
    pub async fn update_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Increment the number of posts written by a user.
    pub async fn increment_post_count(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET post_count = post_count + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete a user by ID.
    ///
    /// Returns true if a user was deleted, false if not found.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List users ordered by username.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users ORDER BY username LIMIT ? OFFSET ?");
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    /// List active users with the given role.
    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ? AND is_active = 1 ORDER BY username"
        );
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(role.as_str())
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Check if a username is already taken (case-insensitive).
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ? COLLATE NOCASE)")
                .bind(username)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }
}

/// Internal struct for mapping database rows to User.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    display_name: String,
    email: Option<String>,
    role: String,
    profile: Option<String>,
    signature: Option<String>,
    post_count: i64,
    is_active: bool,
    created_at: String,
    last_login: Option<String>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            password: self.password,
            display_name: self.display_name,
            email: self.email,
            role: self.role.parse().unwrap_or(Role::Member),
            profile: self.profile,
            signature: self.signature,
            post_count: self.post_count,
            is_active: self.is_active,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("alice", "hash", "Alice").with_email("a@example.com"))
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.display_name, "Alice");
        assert_eq!(user.email, Some("a@example.com".to_string()));
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.post_count, 0);
        assert!(user.is_active);
        assert!(user.last_login.is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_username_is_conflict() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("alice", "hash", "Alice"))
            .await
            .unwrap();
        let result = repo.create(&NewUser::new("ALICE", "hash", "Other")).await;

        assert!(matches!(result, Err(AgoraError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_by_username_case_insensitive() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("Alice", "hash", "Alice"))
            .await
            .unwrap();

        assert!(repo.get_by_username("alice").await.unwrap().is_some());
        assert!(repo.get_by_username("ALICE").await.unwrap().is_some());
        assert!(repo.get_by_username("bob").await.unwrap().is_none());
        assert!(repo.username_exists("aLiCe").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_active_by_usernames() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("alice", "hash", "Alice"))
            .await
            .unwrap();
        let bob = repo.create(&NewUser::new("bob", "hash", "Bob")).await.unwrap();
        repo.create(&NewUser::new("carol", "hash", "Carol"))
            .await
            .unwrap();
        repo.update(bob.id, &UserUpdate::new().is_active(false))
            .await
            .unwrap();

        let names = vec!["ALICE".to_string(), "bob".to_string(), "dave".to_string()];
        let users = repo.get_active_by_usernames(&names).await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
        assert!(repo.get_active_by_usernames(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        let user = repo
            .create(&NewUser::new("alice", "hash", "Alice"))
            .await
            .unwrap();

        let updated = repo
            .update(
                user.id,
                &UserUpdate::new()
                    .display_name("Alice A.")
                    .role(Role::Moderator)
                    .signature(Some("-- a".to_string())),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.display_name, "Alice A.");
        assert_eq!(updated.role, Role::Moderator);
        assert_eq!(updated.signature, Some("-- a".to_string()));

        assert!(repo
            .update(999, &UserUpdate::new().display_name("x"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_last_login() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        let user = repo
            .create(&NewUser::new("alice", "hash", "Alice"))
            .await
            .unwrap();

        repo.update_last_login(user.id).await.unwrap();
        repo.increment_post_count(user.id).await.unwrap();
        repo.increment_post_count(user.id).await.unwrap();
        let user = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(user.last_login.is_some());
        assert_eq!(user.post_count, 2);
    }

    #[tokio::test]
    async fn test_list_count_delete() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("bob", "hash", "Bob")).await.unwrap();
        let alice = repo
            .create(&NewUser::new("alice", "hash", "Alice").with_role(Role::Admin))
            .await
            .unwrap();

        let users = repo.list(0, 10).await.unwrap();
        assert_eq!(users[0].username, "alice");
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.list_by_role(Role::Admin).await.unwrap().len(), 1);

        assert!(repo.delete(alice.id).await.unwrap());
        assert!(!repo.delete(alice.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
