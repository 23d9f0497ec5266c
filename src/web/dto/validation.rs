//! Request body validation.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::community::is_valid_slug;
use crate::db::Role;
use crate::web::error::ApiError;

/// A JSON extractor that runs `validator` rules on the body.
///
/// Malformed JSON is a 400; rule violations are a 422 with messages per field.
///
/// ```ignore
/// async fn create_thread(
///     ValidatedJson(req): ValidatedJson<CreateThreadRequest>,
/// ) -> Result<Json<ThreadResponse>, ApiError> {
///     // req.title and req.body already passed their rules
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {e}")))?;

        value.validate().map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedJson(value))
    }
}

/// Reject control characters other than newline, carriage return and tab.
pub fn no_control_chars(value: &str) -> Result<(), validator::ValidationError> {
    if value
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(validator::ValidationError::new("no_control_chars")
            .with_message("Must not contain control characters".into()));
    }
    Ok(())
}

/// Reject strings that are blank after trimming.
pub fn not_empty_trimmed(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("not_empty_trimmed")
            .with_message("Must not be empty".into()));
    }
    Ok(())
}

/// Non-blank text without any control characters, newlines included.
pub fn single_line(value: &str) -> Result<(), validator::ValidationError> {
    not_empty_trimmed(value)?;
    if value.chars().any(char::is_control) {
        return Err(validator::ValidationError::new("single_line")
            .with_message("Must be a single line of text".into()));
    }
    Ok(())
}

/// Slugs: lowercase ASCII letters, digits and `-`.
pub fn valid_slug(value: &str) -> Result<(), validator::ValidationError> {
    if !is_valid_slug(value) {
        return Err(validator::ValidationError::new("slug").with_message(
            "Must be 2-32 lowercase letters, digits or hyphens".into(),
        ));
    }
    Ok(())
}

/// Role names accepted by the API.
pub fn valid_role(value: &str) -> Result<(), validator::ValidationError> {
    if value.parse::<Role>().is_err() {
        return Err(validator::ValidationError::new("role")
            .with_message("Must be one of guest, member, moderator, admin".into()));
    }
    Ok(())
}
