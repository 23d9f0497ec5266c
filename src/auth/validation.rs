//! Input validation for Agora accounts.
//!
//! Usernames, passwords, display names, email addresses and profile text.

use thiserror::Error;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum display name length.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 32;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum profile text length.
pub const MAX_PROFILE_LENGTH: usize = 2000;

/// Maximum signature length.
pub const MAX_SIGNATURE_LENGTH: usize = 300;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is too short.
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username contains invalid characters.
    #[error("username can only contain letters, digits and underscores")]
    UsernameInvalidChars,

    /// Username is reserved.
    #[error("this username is reserved")]
    UsernameReserved,

    /// Password is too short.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,

    /// Password equals the username.
    #[error("password cannot be the same as username")]
    PasswordSameAsUsername,

    /// Display name is empty.
    #[error("display name cannot be empty")]
    DisplayNameEmpty,

    /// Display name is too long.
    #[error("display name must be at most {MAX_DISPLAY_NAME_LENGTH} characters")]
    DisplayNameTooLong,

    /// Display name contains control characters.
    #[error("display name contains invalid characters")]
    DisplayNameInvalidChars,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("invalid email format")]
    EmailInvalidFormat,

    /// Profile text is too long.
    #[error("profile must be at most {MAX_PROFILE_LENGTH} characters")]
    ProfileTooLong,

    /// Signature is too long.
    #[error("signature must be at most {MAX_SIGNATURE_LENGTH} characters")]
    SignatureTooLong,
}

/// Usernames that cannot be registered.
const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "administrator",
    "anonymous",
    "agora",
    "everyone",
    "guest",
    "here",
    "mod",
    "moderator",
    "null",
    "root",
    "staff",
    "support",
    "system",
    "undefined",
];

/// Check if a username is reserved (case-insensitive).
pub fn is_reserved_username(username: &str) -> bool {
    let lower = username.to_ascii_lowercase();
    RESERVED_USERNAMES.contains(&lower.as_str())
}

/// Validate a username.
///
/// # Examples
///
/// ```
/// use agora::auth::validation::validate_username;
///
/// assert!(validate_username("jane_doe").is_ok());
/// assert!(validate_username("jd").is_err());
/// assert!(validate_username("Admin").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooShort);
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::UsernameInvalidChars);
    }
    if is_reserved_username(username) {
        return Err(ValidationError::UsernameReserved);
    }
    Ok(())
}

/// Validate a new password, optionally against the username.
pub fn validate_registration_password(
    password: &str,
    username: Option<&str>,
) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    if let Some(user) = username {
        if password.eq_ignore_ascii_case(user) {
            return Err(ValidationError::PasswordSameAsUsername);
        }
    }
    Ok(())
}

/// Validate a display name.
pub fn validate_display_name(display_name: &str) -> Result<(), ValidationError> {
    if display_name.trim().is_empty() {
        return Err(ValidationError::DisplayNameEmpty);
    }
    if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(ValidationError::DisplayNameTooLong);
    }
    if display_name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::DisplayNameInvalidChars);
    }
    Ok(())
}

/// Validate an email address.
///
/// Only a structural check: one `@`, a non-empty local part and a dotted
/// domain without empty labels.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::EmailInvalidFormat);
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ValidationError::EmailInvalidFormat);
    }
    if domain.split('.').any(str::is_empty) {
        return Err(ValidationError::EmailInvalidFormat);
    }
    Ok(())
}

/// Validate profile text.
pub fn validate_profile(profile: &str) -> Result<(), ValidationError> {
    if profile.chars().count() > MAX_PROFILE_LENGTH {
        return Err(ValidationError::ProfileTooLong);
    }
    Ok(())
}

/// Validate a post signature.
pub fn validate_signature(signature: &str) -> Result<(), ValidationError> {
    if signature.chars().count() > MAX_SIGNATURE_LENGTH {
        return Err(ValidationError::SignatureTooLong);
    }
    Ok(())
}

/// Validate all registration fields, returning the first error.
pub fn validate_registration(
    username: &str,
    password: &str,
    display_name: &str,
    email: Option<&str>,
) -> Result<(), ValidationError> {
    validate_username(username)?;
    validate_registration_password(password, Some(username))?;
    validate_display_name(display_name)?;
    if let Some(email) = email {
        validate_email(email)?;
    }
    Ok(())
}
