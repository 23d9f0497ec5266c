//! Session authentication extractors.
//!
//! The session token is read from the session cookie, or from an
//! `Authorization: Bearer` header for API clients.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;

use crate::db::User;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Pull the session token out of request headers.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|t| !t.is_empty())
}

/// The logged-in user of a request. Rejects with 401 when there is no valid
/// session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session_id: i64,
    /// Plain session token, needed to log out.
    pub token: String,
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, ApiError> {
    let Some(token) = session_token(&parts.headers, &state.config.session.cookie_name) else {
        return Ok(None);
    };
    let session = state.sessions.authenticate(&token).await?;
    Ok(session.map(|s| CurrentUser {
        user: s.user,
        session_id: s.session.id,
        token,
    }))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Login required"))
    }
}

/// The logged-in user if there is one. Invalid or expired tokens are
/// treated as a guest.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    /// The user, if logged in.
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref().map(|c| &c.user)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve(parts, state).await?))
    }
}
