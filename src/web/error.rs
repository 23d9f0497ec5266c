//! API error handling.

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{PermissionError, ProfileError, RegistrationError, SessionError};
use crate::AgoraError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request (400).
    BadRequest,
    /// Missing or invalid session (401).
    Unauthorized,
    /// Not allowed (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Conflicts with existing state (409).
    Conflict,
    /// Field-level validation failure (422).
    ValidationError,
    /// Request understood but rejected (422).
    UnprocessableEntity,
    /// Request or upload too large (413).
    PayloadTooLarge,
    /// Rate limit exceeded (429).
    TooManyRequests,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ValidationError | ErrorCode::UnprocessableEntity => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body: `{"error": {"code", "message", "details"?}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    /// Messages per field, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    /// Create an error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnprocessableEntity, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Validation error with messages per field.
    pub fn validation(details: HashMap<String, Vec<String>>) -> Self {
        Self {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    /// Convert `validator` errors into a field-level validation error.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, field_errors)| {
                let messages = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("invalid value for {field}"))
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::validation(details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AgoraError> for ApiError {
    fn from(err: AgoraError) -> Self {
        match err {
            AgoraError::Auth(msg) => ApiError::unauthorized(msg),
            AgoraError::Permission(msg) => ApiError::forbidden(msg),
            AgoraError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            AgoraError::Validation(msg) => ApiError::unprocessable(msg),
            AgoraError::Conflict(msg) => ApiError::conflict(msg),
            other => {
                tracing::error!(error = %other, "Internal error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        AgoraError::from(err).into()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidCredentials => {
                ApiError::unauthorized("Invalid username or password")
            }
            SessionError::AccountLocked(_) => ApiError::too_many_requests(err.to_string()),
            SessionError::AccountInactive | SessionError::Banned(_) => {
                ApiError::forbidden(err.to_string())
            }
            SessionError::Validation(e) => ApiError::unprocessable(e.to_string()),
            SessionError::Password(_) | SessionError::Database(_) => {
                tracing::error!(error = %err, "Session error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(e) => ApiError::unprocessable(e.to_string()),
            RegistrationError::UsernameExists => ApiError::conflict("Username already exists"),
            RegistrationError::Password(_) | RegistrationError::Database(_) => {
                tracing::error!(error = %err, "Registration error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::UserNotFound => ApiError::not_found("User not found"),
            ProfileError::Validation(e) => ApiError::unprocessable(e.to_string()),
            ProfileError::Database(_) => {
                tracing::error!(error = %err, "Profile error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::ValidationError.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::TooManyRequests.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_from_agora_error() {
        let cases = [
            (AgoraError::Auth("x".into()), ErrorCode::Unauthorized),
            (AgoraError::Permission("x".into()), ErrorCode::Forbidden),
            (AgoraError::NotFound("thread".into()), ErrorCode::NotFound),
            (AgoraError::Validation("x".into()), ErrorCode::UnprocessableEntity),
            (AgoraError::Conflict("x".into()), ErrorCode::Conflict),
            (AgoraError::Database("boom".into()), ErrorCode::InternalError),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code(), code);
        }

        let err = ApiError::from(AgoraError::NotFound("thread".into()));
        assert_eq!(err.message(), "thread not found");
        let err = ApiError::from(AgoraError::Database("secret detail".into()));
        assert!(!err.message().contains("secret"));
    }

    #[test]
    fn test_from_session_error() {
        assert_eq!(
            ApiError::from(SessionError::InvalidCredentials).code(),
            ErrorCode::Unauthorized
        );
        assert_eq!(
            ApiError::from(SessionError::AccountLocked(30)).code(),
            ErrorCode::TooManyRequests
        );
        assert_eq!(
            ApiError::from(SessionError::Banned("spam".into())).code(),
            ErrorCode::Forbidden
        );
    }

    #[test]
    fn test_validation_error_details() {
        let mut details = HashMap::new();
        details.insert("title".to_string(), vec!["too long".to_string()]);
        let err = ApiError::validation(details);
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.details.unwrap()["title"], vec!["too long".to_string()]);
    }

    #[tokio::test]
    async fn test_error_response_body() {
        use http_body_util::BodyExt;

        let response = ApiError::not_found("Board not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "Board not found");
        assert!(body["error"].get("details").is_none());
    }
}
