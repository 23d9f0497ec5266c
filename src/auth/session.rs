//! Login sessions for Agora.
//!
//! Sessions are persisted in the `sessions` table. The client holds a random
//! token; the database only sees its SHA-256 digest. Failed logins are
//! rate limited per username by an in-memory [`LoginLimiter`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{hash_password, validation, verify_password, PasswordError, ValidationError};
use crate::config::SessionConfig;
use crate::datetime::sql_datetime_after_secs;
use crate::db::{DbPool, NewSession, SessionRecord, SessionRepository, User, UserRepository, UserUpdate};
use crate::moderation::BanRepository;
use crate::AgoraError;

/// Session-related errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Wrong username or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts.
    #[error("too many failed attempts, try again in {0} seconds")]
    AccountLocked(u64),

    /// Account is deactivated.
    #[error("account is inactive")]
    AccountInactive,

    /// Account is banned site-wide.
    #[error("account is banned: {0}")]
    Banned(String),

    /// New password rejected.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Storage failure.
    #[error("database error: {0}")]
    Database(String),
}

impl From<AgoraError> for SessionError {
    fn from(e: AgoraError) -> Self {
        SessionError::Database(e.to_string())
    }
}

/// Maximum failed login attempts inside the window before lockout.
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// Window for counting failed attempts (5 minutes).
pub const ATTEMPT_WINDOW_SECS: u64 = 5 * 60;

/// Lockout duration (5 minutes).
pub const LOCKOUT_DURATION_SECS: u64 = 5 * 60;

/// Most usernames tracked at once. Unknown usernames are tracked too, so
/// lockouts do not reveal which accounts exist.
pub const MAX_TRACKED_USERNAMES: usize = 10_000;

/// Result of a login attempt rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitResult {
    /// Login attempt is allowed.
    Allowed,
    /// Username is locked for the remaining duration.
    Locked(Duration),
}

/// Failed login tracker keyed by lowercase username.
#[derive(Debug)]
pub struct LoginLimiter {
    attempts: HashMap<String, Vec<Instant>>,
    max_entries: usize,
    max_attempts: usize,
    window: Duration,
    lockout: Duration,
}

impl Default for LoginLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginLimiter {
    /// Create a limiter with the default thresholds.
    pub fn new() -> Self {
        Self::with_config(MAX_LOGIN_ATTEMPTS, ATTEMPT_WINDOW_SECS, LOCKOUT_DURATION_SECS)
    }

    /// Create a limiter with custom thresholds.
    pub fn with_config(max_attempts: u32, window_secs: u64, lockout_secs: u64) -> Self {
        Self {
            attempts: HashMap::new(),
            max_entries: MAX_TRACKED_USERNAMES,
            max_attempts: max_attempts.max(1) as usize,
            window: Duration::from_secs(window_secs),
            lockout: Duration::from_secs(lockout_secs),
        }
    }

    /// Limit the number of usernames tracked at once.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Number of usernames currently tracked.
    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }

    /// Check whether a login attempt is allowed for the username.
    pub fn check(&mut self, username: &str) -> LimitResult {
        self.check_at(username, Instant::now())
    }

    fn check_at(&mut self, username: &str, now: Instant) -> LimitResult {
        let key = username.to_lowercase();
        let Some(attempts) = self.attempts.get_mut(&key) else {
            return LimitResult::Allowed;
        };

        if attempts.len() >= self.max_attempts {
            // Locked from the failure that reached the limit.
            let last = attempts[attempts.len() - 1];
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.lockout {
                return LimitResult::Locked(self.lockout - elapsed);
            }
            self.attempts.remove(&key);
            return LimitResult::Allowed;
        }

        let window = self.window;
        attempts.retain(|t| now.saturating_duration_since(*t) < window);
        LimitResult::Allowed
    }

    /// Record a failed login attempt.
    pub fn record_failure(&mut self, username: &str) {
        self.record_failure_at(username, Instant::now());
    }

    fn record_failure_at(&mut self, username: &str, now: Instant) {
        let key = username.to_lowercase();
        if !self.attempts.contains_key(&key) && self.attempts.len() >= self.max_entries {
            self.make_room(now);
        }

        let window = self.window;
        let attempts = self.attempts.entry(key).or_default();
        attempts.retain(|t| now.saturating_duration_since(*t) < window);
        attempts.push(now);

        debug!(
            username = %username,
            attempt_count = attempts.len(),
            "Recorded failed login attempt"
        );
    }

    /// Forget all failures for a username.
    pub fn clear(&mut self, username: &str) {
        self.attempts.remove(&username.to_lowercase());
    }

    /// Number of recorded failures for a username.
    pub fn attempt_count(&self, username: &str) -> usize {
        self.attempts
            .get(&username.to_lowercase())
            .map_or(0, Vec::len)
    }

    /// Free one slot: drop expired entries, or else the least recently failed one.
    fn make_room(&mut self, now: Instant) {
        self.cleanup_at(now);
        if self.attempts.len() < self.max_entries {
            return;
        }
        let oldest = self
            .attempts
            .iter()
            .min_by_key(|(_, attempts)| attempts.last().copied())
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            debug!(username = %key, "Login limiter full, evicting oldest entry");
            self.attempts.remove(&key);
        }
    }

    /// Drop entries whose window and lockout have both passed.
    pub fn cleanup(&mut self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&mut self, now: Instant) {
        let keep_for = self.window.max(self.lockout);
        self.attempts.retain(|_, attempts| {
            attempts
                .last()
                .is_some_and(|last| now.saturating_duration_since(*last) < keep_for)
        });
    }
}

/// Generate a new session token: a UUID v4 followed by 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let random: [u8; 32] = rand::random();
    let mut token = Uuid::new_v4().simple().to_string();
    for byte in random {
        token.push_str(&format!("{byte:02x}"));
    }
    token
}

/// Hex SHA-256 digest of a session token.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Client details recorded with a new session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    /// Remote IP address.
    pub ip_address: Option<String>,
    /// User agent header.
    pub user_agent: Option<String>,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Plain token to hand to the client. Never stored.
    pub token: String,
    /// Logged-in user.
    pub user: User,
    /// Stored session row.
    pub session: SessionRecord,
}

/// An authenticated request's user and session.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    /// The session's user.
    pub user: User,
    /// The session row.
    pub session: SessionRecord,
}

/// Database-backed session service.
#[derive(Debug)]
pub struct SessionService {
    pool: DbPool,
    ttl_secs: i64,
    limiter: Mutex<LoginLimiter>,
}

impl SessionService {
    /// Create a session service.
    pub fn new(pool: DbPool, config: &SessionConfig) -> Self {
        Self::with_limiter(pool, config, LoginLimiter::new())
    }

    /// Create a session service with a custom login limiter.
    pub fn with_limiter(pool: DbPool, config: &SessionConfig, limiter: LoginLimiter) -> Self {
        Self {
            pool,
            ttl_secs: i64::try_from(config.ttl_hours.saturating_mul(60 * 60)).unwrap_or(i64::MAX),
            limiter: Mutex::new(limiter),
        }
    }

    /// Session lifetime in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    fn limiter(&self) -> std::sync::MutexGuard<'_, LoginLimiter> {
        self.limiter
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Verify credentials and open a new session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<LoginOutcome, SessionError> {
        if let LimitResult::Locked(remaining) = self.limiter().check(username) {
            warn!(
                username = %username,
                remaining_secs = remaining.as_secs(),
                "Login attempt blocked: too many failures"
            );
            return Err(SessionError::AccountLocked(remaining.as_secs().max(1)));
        }

        let users = UserRepository::new(&self.pool);
        let Some(user) = users.get_by_username(username).await? else {
            self.limiter().record_failure(username);
            warn!(username = %username, "Login failed: user not found");
            return Err(SessionError::InvalidCredentials);
        };

        if verify_password(password, &user.password).is_err() {
            self.limiter().record_failure(username);
            warn!(username = %username, "Login failed: wrong password");
            return Err(SessionError::InvalidCredentials);
        }
        self.limiter().clear(username);

        if !user.is_active {
            warn!(user_id = user.id, "Login refused: account inactive");
            return Err(SessionError::AccountInactive);
        }

        if let Some(ban) = BanRepository::new(&self.pool)
            .find_active(user.id, None)
            .await?
        {
            warn!(user_id = user.id, ban_id = ban.id, "Login refused: account banned");
            return Err(SessionError::Banned(ban.reason));
        }

        let expires_at = sql_datetime_after_secs(self.ttl_secs)?;
        let token = generate_token();
        let session = SessionRepository::new(&self.pool)
            .create(&NewSession {
                user_id: user.id,
                token_hash: hash_token(&token),
                ip_address: client.ip_address,
                user_agent: client.user_agent,
                expires_at,
            })
            .await?;
        users.update_last_login(user.id).await?;

        info!(user_id = user.id, session_id = session.id, "Login successful");

        Ok(LoginOutcome {
            token,
            user,
            session,
        })
    }

    /// Close the session for a token. Returns false if it did not exist.
    pub async fn logout(&self, token: &str) -> crate::Result<bool> {
        let removed = SessionRepository::new(&self.pool)
            .delete_by_hash(&hash_token(token))
            .await?;
        if removed {
            debug!("Session logged out");
        }
        Ok(removed)
    }

    /// Close every session of a user.
    pub async fn logout_user(&self, user_id: i64) -> crate::Result<u64> {
        let count = SessionRepository::new(&self.pool)
            .delete_for_user(user_id)
            .await?;
        info!(user_id, count, "Closed all sessions for user");
        Ok(count)
    }

    /// Resolve a token to its user.
    ///
    /// Returns `None` for unknown or expired tokens and for inactive accounts.
    pub async fn authenticate(&self, token: &str) -> crate::Result<Option<AuthenticatedSession>> {
        let sessions = SessionRepository::new(&self.pool);
        let Some(session) = sessions.get_valid_by_hash(&hash_token(token)).await? else {
            return Ok(None);
        };

        let Some(user) = UserRepository::new(&self.pool)
            .get_by_id(session.user_id)
            .await?
        else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        sessions.touch(session.id).await?;
        Ok(Some(AuthenticatedSession { user, session }))
    }

    /// Change a user's password after checking the current one.
    ///
    /// Every other session of the user is closed.
    pub async fn change_password(
        &self,
        user: &User,
        current_session_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        if verify_password(current_password, &user.password).is_err() {
            return Err(SessionError::InvalidCredentials);
        }
        validation::validate_registration_password(new_password, Some(&user.username))?;
        let hash = hash_password(new_password)?;

        UserRepository::new(&self.pool)
            .update(user.id, &UserUpdate::new().password(hash))
            .await?;
        let closed = SessionRepository::new(&self.pool)
            .delete_others_for_user(user.id, current_session_id)
            .await?;

        info!(user_id = user.id, closed_sessions = closed, "Password changed");
        Ok(())
    }

    /// Remove expired sessions and stale limiter entries.
    pub async fn cleanup_expired(&self) -> crate::Result<u64> {
        self.limiter().cleanup();
        let removed = SessionRepository::new(&self.pool).cleanup_expired().await?;
        if removed > 0 {
            info!(removed, "Cleaned up expired sessions");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{register, RegistrationRequest};
    use crate::moderation::{BanRepository, NewBan};
    use crate::Database;

    async fn setup() -> (Database, SessionService) {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        register(&repo, RegistrationRequest::new("alice", "password123", "Alice"))
            .await
            .unwrap();
        register(&repo, RegistrationRequest::new("bob", "password123", "Bob"))
            .await
            .unwrap();
        let service = SessionService::new(db.pool().clone(), &SessionConfig::default());
        (db, service)
    }

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 32 + 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate_token(), token);
    }

    #[test]
    fn test_hash_token() {
        let hash = hash_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(hash_token("abd"), hash);
    }

    #[test]
    fn test_limiter_locks_after_max_attempts() {
        let mut limiter = LoginLimiter::new();
        let start = Instant::now();

        for _ in 0..2 {
            limiter.record_failure_at("alice", start);
            assert_eq!(limiter.check_at("alice", start), LimitResult::Allowed);
        }
        limiter.record_failure_at("alice", start);

        assert!(matches!(
            limiter.check_at("alice", start + Duration::from_secs(10)),
            LimitResult::Locked(_)
        ));
        assert_eq!(
            limiter.check_at("alice", start + Duration::from_secs(LOCKOUT_DURATION_SECS)),
            LimitResult::Allowed
        );
        assert_eq!(limiter.attempt_count("alice"), 0);
    }

    #[test]
    fn test_limiter_window_expires_old_failures() {
        let mut limiter = LoginLimiter::new();
        let start = Instant::now();

        limiter.record_failure_at("alice", start);
        limiter.record_failure_at("alice", start);
        let later = start + Duration::from_secs(ATTEMPT_WINDOW_SECS + 1);
        limiter.record_failure_at("alice", later);

        assert_eq!(limiter.attempt_count("alice"), 1);
        assert_eq!(limiter.check_at("alice", later), LimitResult::Allowed);
    }

    #[test]
    fn test_limiter_is_bounded() {
        let mut limiter = LoginLimiter::new().with_max_entries(100);
        let start = Instant::now();

        for i in 0..1000u64 {
            limiter.record_failure_at(&format!("ghost{i}"), start + Duration::from_millis(i));
        }
        assert_eq!(limiter.tracked(), 100);
        // The most recent failures survive eviction.
        assert_eq!(limiter.attempt_count("ghost999"), 1);
        assert_eq!(limiter.attempt_count("ghost0"), 0);

        // Expired entries are pruned before anything live is evicted.
        let later = start + Duration::from_secs(ATTEMPT_WINDOW_SECS + LOCKOUT_DURATION_SECS);
        limiter.record_failure_at("alice", later);
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn test_limiter_case_insensitive_and_clear() {
        let mut limiter = LoginLimiter::with_config(1, 60, 60);
        limiter.record_failure("Alice");
        assert!(matches!(limiter.check("ALICE"), LimitResult::Locked(_)));

        limiter.clear("alice");
        assert_eq!(limiter.check("alice"), LimitResult::Allowed);
    }

    #[tokio::test]
    async fn test_login_and_authenticate() {
        let (db, service) = setup().await;

        let outcome = service
            .login("alice", "password123", ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(outcome.user.username, "alice");

        let stored: String = sqlx::query_scalar("SELECT token_hash FROM sessions WHERE id = ?")
            .bind(outcome.session.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_ne!(stored, outcome.token);
        assert_eq!(stored, hash_token(&outcome.token));

        let auth = service.authenticate(&outcome.token).await.unwrap().unwrap();
        assert_eq!(auth.user.id, outcome.user.id);
        assert!(auth.user.last_login.is_some());

        assert!(service.authenticate("bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_password_then_locked() {
        let (_db, service) = setup().await;

        for _ in 0..MAX_LOGIN_ATTEMPTS {
            let result = service
                .login("alice", "wrong-password", ClientInfo::default())
                .await;
            assert!(matches!(result, Err(SessionError::InvalidCredentials)));
        }

        let result = service
            .login("alice", "password123", ClientInfo::default())
            .await;
        assert!(matches!(result, Err(SessionError::AccountLocked(_))));

        // Other usernames are unaffected.
        assert!(service
            .login("bob", "password123", ClientInfo::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let (_db, service) = setup().await;
        let result = service
            .login("nobody", "password123", ClientInfo::default())
            .await;
        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_inactive_account() {
        let (db, service) = setup().await;
        let repo = UserRepository::new(db.pool());
        let bob = repo.get_by_username("bob").await.unwrap().unwrap();
        repo.update(bob.id, &UserUpdate::new().is_active(false))
            .await
            .unwrap();

        let result = service
            .login("bob", "password123", ClientInfo::default())
            .await;
        assert!(matches!(result, Err(SessionError::AccountInactive)));
    }

    #[tokio::test]
    async fn test_login_globally_banned() {
        let (db, service) = setup().await;
        BanRepository::new(db.pool())
            .create(&NewBan {
                user_id: 2,
                community_id: None,
                reason: "spam".to_string(),
                banned_by: Some(1),
                expires_at: None,
            })
            .await
            .unwrap();

        let result = service
            .login("bob", "password123", ClientInfo::default())
            .await;
        assert!(matches!(result, Err(SessionError::Banned(reason)) if reason == "spam"));
    }

    #[tokio::test]
    async fn test_logout() {
        let (_db, service) = setup().await;
        let outcome = service
            .login("alice", "password123", ClientInfo::default())
            .await
            .unwrap();

        assert!(service.logout(&outcome.token).await.unwrap());
        assert!(!service.logout(&outcome.token).await.unwrap());
        assert!(service.authenticate(&outcome.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_inactive_user() {
        let (db, service) = setup().await;
        let outcome = service
            .login("bob", "password123", ClientInfo::default())
            .await
            .unwrap();
        UserRepository::new(db.pool())
            .update(outcome.user.id, &UserUpdate::new().is_active(false))
            .await
            .unwrap();

        assert!(service.authenticate(&outcome.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_change_password_closes_other_sessions() {
        let (_db, service) = setup().await;
        let first = service
            .login("alice", "password123", ClientInfo::default())
            .await
            .unwrap();
        let second = service
            .login("alice", "password123", ClientInfo::default())
            .await
            .unwrap();

        let result = service
            .change_password(&first.user, first.session.id, "nope-nope", "newpassword1")
            .await;
        assert!(matches!(result, Err(SessionError::InvalidCredentials)));

        service
            .change_password(&first.user, first.session.id, "password123", "newpassword1")
            .await
            .unwrap();

        assert!(service.authenticate(&first.token).await.unwrap().is_some());
        assert!(service.authenticate(&second.token).await.unwrap().is_none());
        assert!(service
            .login("alice", "newpassword1", ClientInfo::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let (db, service) = setup().await;
        let outcome = service
            .login("alice", "password123", ClientInfo::default())
            .await
            .unwrap();
        sqlx::query("UPDATE sessions SET expires_at = '2000-01-01 00:00:00' WHERE id = ?")
            .bind(outcome.session.id)
            .execute(db.pool())
            .await
            .unwrap();

        assert!(service.authenticate(&outcome.token).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired().await.unwrap(), 1);
    }
}
