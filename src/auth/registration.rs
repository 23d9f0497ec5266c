//! User registration for Agora.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_registration, ValidationError};
use crate::auth::{hash_password, PasswordError};
use crate::db::{NewUser, Role, User, UserRepository};
use crate::AgoraError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Username already exists.
    #[error("username already exists")]
    UsernameExists,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<AgoraError> for RegistrationError {
    fn from(e: AgoraError) -> Self {
        match e {
            AgoraError::Conflict(_) => RegistrationError::UsernameExists,
            other => RegistrationError::Database(other.to_string()),
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Desired username.
    pub username: String,
    /// Plain-text password.
    pub password: String,
    /// Display name.
    pub display_name: String,
    /// Optional email address.
    pub email: Option<String>,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            display_name: display_name.into(),
            email: None,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Register a new user.
///
/// The very first account on a fresh installation becomes an Admin; every
/// later account starts as a Member.
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
) -> Result<User, RegistrationError> {
    let role = if repo.count().await? == 0 {
        Role::Admin
    } else {
        Role::Member
    };
    register_with_role(repo, request, role).await
}

/// Register a new user with a specific role.
pub async fn register_with_role(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
    role: Role,
) -> Result<User, RegistrationError> {
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    let display_name = request.display_name.trim();

    validate_registration(&request.username, &request.password, display_name, email)?;

    if repo.username_exists(&request.username).await? {
        return Err(RegistrationError::UsernameExists);
    }

    let password_hash = hash_password(&request.password)?;

    let mut new_user =
        NewUser::new(&request.username, password_hash, display_name).with_role(role);
    if let Some(email) = email {
        new_user = new_user.with_email(email);
    }

    let user = repo.create(&new_user).await?;

    info!(
        username = %user.username,
        user_id = user.id,
        role = %user.role,
        "New user registered"
    );

    Ok(user)
}
