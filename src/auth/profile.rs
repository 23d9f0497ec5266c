//! User profiles for Agora.
//!
//! Public profile view and self-service profile updates.

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::auth::validation::{
    validate_display_name, validate_email, validate_profile, validate_signature, ValidationError,
};
use crate::db::{Role, User, UserRepository, UserUpdate};
use crate::AgoraError;

/// Profile-related errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Validation failed.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<AgoraError> for ProfileError {
    fn from(e: AgoraError) -> Self {
        ProfileError::Database(e.to_string())
    }
}

/// User profile for public display. Never carries the password hash or email.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// User ID.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Global role.
    pub role: Role,
    /// Self-introduction text.
    pub profile: Option<String>,
    /// Post signature.
    pub signature: Option<String>,
    /// Number of posts written.
    pub post_count: i64,
    /// Account creation date.
    pub created_at: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            profile: user.profile.clone(),
            signature: user.signature.clone(),
            post_count: user.post_count,
            created_at: user.created_at.clone(),
        }
    }
}

/// Profile update request. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateRequest {
    /// New display name.
    pub display_name: Option<String>,
    /// New email address.
    pub email: Option<Option<String>>,
    /// New profile text.
    pub profile: Option<Option<String>>,
    /// New signature.
    pub signature: Option<Option<String>>,
}

impl ProfileUpdateRequest {
    /// Create a new empty update request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set new display name.
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set or clear the email.
    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = Some(email);
        self
    }

    /// Set or clear the profile text.
    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Set or clear the signature.
    pub fn signature(mut self, signature: Option<String>) -> Self {
        self.signature = Some(signature);
        self
    }
}

/// Get the public profile of a user by username.
pub async fn get_profile_by_username(
    repo: &UserRepository<'_>,
    username: &str,
) -> Result<UserProfile, ProfileError> {
    let user = repo
        .get_by_username(username)
        .await?
        .ok_or(ProfileError::UserNotFound)?;
    Ok(UserProfile::from(&user))
}

/// Validate and apply a profile update. Blank optional fields are cleared.
pub async fn update_profile(
    repo: &UserRepository<'_>,
    user_id: i64,
    request: ProfileUpdateRequest,
) -> Result<User, ProfileError> {
    fn normalize(value: Option<Option<String>>) -> Option<Option<String>> {
        value.map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
    }

    let mut update = UserUpdate::new();

    if let Some(display_name) = request.display_name {
        let display_name = display_name.trim();
        validate_display_name(display_name)?;
        update = update.display_name(display_name);
    }
    if let Some(email) = normalize(request.email) {
        if let Some(ref e) = email {
            validate_email(e)?;
        }
        update = update.email(email);
    }
    if let Some(profile) = normalize(request.profile) {
        if let Some(ref p) = profile {
            validate_profile(p)?;
        }
        update = update.profile(profile);
    }
    if let Some(signature) = normalize(request.signature) {
        if let Some(ref s) = signature {
            validate_signature(s)?;
        }
        update = update.signature(signature);
    }

    let user = repo
        .update(user_id, &update)
        .await?
        .ok_or(ProfileError::UserNotFound)?;

    info!(user_id, "Profile updated");
    Ok(user)
}
