//! Error types for Agora.

use thiserror::Error;

/// Common error type for Agora.
#[derive(Error, Debug)]
pub enum AgoraError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Resource already exists or conflicts with current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for AgoraError {
    fn from(e: sqlx::Error) -> Self {
        AgoraError::Database(e.to_string())
    }
}

impl From<crate::auth::PermissionError> for AgoraError {
    fn from(e: crate::auth::PermissionError) -> Self {
        match e {
            crate::auth::PermissionError::NotAuthenticated => AgoraError::Auth(e.to_string()),
            _ => AgoraError::Permission(e.to_string()),
        }
    }
}

impl From<crate::auth::ValidationError> for AgoraError {
    fn from(e: crate::auth::ValidationError) -> Self {
        AgoraError::Validation(e.to_string())
    }
}

impl From<crate::auth::PasswordError> for AgoraError {
    fn from(e: crate::auth::PasswordError) -> Self {
        match e {
            crate::auth::PasswordError::TooShort | crate::auth::PasswordError::TooLong => {
                AgoraError::Validation(e.to_string())
            }
            crate::auth::PasswordError::VerificationFailed => AgoraError::Auth(e.to_string()),
            _ => AgoraError::Auth(format!("password processing failed: {e}")),
        }
    }
}

impl From<crate::auth::RegistrationError> for AgoraError {
    fn from(e: crate::auth::RegistrationError) -> Self {
        use crate::auth::RegistrationError;
        match e {
            RegistrationError::Validation(v) => AgoraError::Validation(v.to_string()),
            RegistrationError::UsernameExists => AgoraError::Conflict(e.to_string()),
            RegistrationError::Password(p) => p.into(),
            RegistrationError::Database(msg) => AgoraError::Database(msg),
        }
    }
}

impl From<crate::auth::SessionError> for AgoraError {
    fn from(e: crate::auth::SessionError) -> Self {
        use crate::auth::SessionError;
        match e {
            SessionError::InvalidCredentials | SessionError::AccountLocked(_) => {
                AgoraError::Auth(e.to_string())
            }
            SessionError::AccountInactive | SessionError::Banned(_) => {
                AgoraError::Permission(e.to_string())
            }
            SessionError::Validation(v) => AgoraError::Validation(v.to_string()),
            SessionError::Password(p) => p.into(),
            SessionError::Database(msg) => AgoraError::Database(msg),
        }
    }
}

impl From<crate::auth::ProfileError> for AgoraError {
    fn from(e: crate::auth::ProfileError) -> Self {
        use crate::auth::ProfileError;
        match e {
            ProfileError::UserNotFound => AgoraError::NotFound("user".to_string()),
            ProfileError::Validation(v) => AgoraError::Validation(v.to_string()),
            ProfileError::Database(msg) => AgoraError::Database(msg),
        }
    }
}

/// Result type alias for Agora operations.
pub type Result<T> = std::result::Result<T, AgoraError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{PermissionError, RegistrationError, SessionError};

    #[test]
    fn test_auth_error_display() {
        let err = AgoraError::Auth("invalid password".to_string());
        assert_eq!(err.to_string(), "authentication error: invalid password");
    }

    #[test]
    fn test_permission_error_display() {
        let err = AgoraError::Permission("admin access required".to_string());
        assert_eq!(err.to_string(), "permission denied: admin access required");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = AgoraError::NotFound("thread".to_string());
        assert_eq!(err.to_string(), "thread not found");
    }

    #[test]
    fn test_conflict_error_display() {
        let err = AgoraError::Conflict("username already exists".to_string());
        assert_eq!(err.to_string(), "conflict: username already exists");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AgoraError = io_err.into();
        assert!(matches!(err, AgoraError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_permission_error_conversion() {
        let err: AgoraError = PermissionError::NotAuthenticated.into();
        assert!(matches!(err, AgoraError::Auth(_)));

        let err: AgoraError = PermissionError::Banned("spam".to_string()).into();
        assert!(matches!(err, AgoraError::Permission(_)));
    }

    #[test]
    fn test_auth_subsystem_conversions() {
        let err: AgoraError = RegistrationError::UsernameExists.into();
        assert!(matches!(err, AgoraError::Conflict(_)));

        let err: AgoraError = SessionError::InvalidCredentials.into();
        assert!(matches!(err, AgoraError::Auth(_)));

        let err: AgoraError = SessionError::Banned("spam".to_string()).into();
        assert!(matches!(err, AgoraError::Permission(_)));
    }
}
