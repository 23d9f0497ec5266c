//! Application state and authentication handlers.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    Json,
};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::UserAgent,
    TypedHeader,
};

use crate::attachment::FileStorage;
use crate::auth::{register as register_user, ClientInfo, RegistrationRequest, SessionService};
use crate::db::UserRepository;
use crate::notification::NotificationService;
use crate::web::dto::{
    ApiResponse, ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse,
    RegisterRequest, StatusResponse, UserResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::CurrentUser;
use crate::{Config, Database, Result};

/// State shared by every handler.
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub sessions: Arc<SessionService>,
    pub storage: FileStorage,
}

impl AppState {
    /// Build the state, creating the attachment directory if needed.
    pub fn new(db: Database, config: Config) -> Result<Self> {
        let storage = FileStorage::new(&config.attachments.storage_path)?;
        Ok(Self::with_storage(db, config, storage))
    }

    /// Build the state around an existing storage directory.
    pub fn with_storage(db: Database, config: Config, storage: FileStorage) -> Self {
        let sessions = Arc::new(SessionService::new(db.pool().clone(), &config.session));
        Self {
            db,
            config: Arc::new(config),
            sessions,
            storage,
        }
    }

    /// Session cookie carrying `token`. No Max-Age: expiry is enforced
    /// server-side and logout clears the cookie.
    fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.config.session.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.config.session.secure_cookie)
            .build()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.config.session.cookie_name.clone(), ""))
            .path("/")
            .build()
    }
}

/// POST /api/auth/register - Create an account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> std::result::Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let mut request = RegistrationRequest::new(req.username, req.password, req.display_name);
    if let Some(email) = req.email.filter(|e| !e.trim().is_empty()) {
        request = request.with_email(email);
    }

    let user = register_user(&UserRepository::new(state.db.pool()), request).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserResponse::from(&user))),
    ))
}

/// POST /api/auth/login - Open a session and set the session cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> std::result::Result<(CookieJar, Json<ApiResponse<LoginResponse>>), ApiError> {
    let client = ClientInfo {
        ip_address: connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent: user_agent.map(|TypedHeader(ua)| ua.as_str().to_string()),
    };

    let outcome = state
        .sessions
        .login(&req.username, &req.password, client)
        .await?;
    let unread = NotificationService::new(&state.db)
        .unread_count(&outcome.user)
        .await?;

    let response = LoginResponse {
        token: outcome.token.clone(),
        expires_in: state.sessions.ttl_secs(),
        user: MeResponse::new(&outcome.user, unread),
    };
    let jar = jar.add(state.session_cookie(outcome.token));

    Ok((jar, Json(ApiResponse::new(response))))
}

/// POST /api/auth/logout - Close the current session and clear the cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    jar: CookieJar,
) -> std::result::Result<(CookieJar, Json<ApiResponse<StatusResponse>>), ApiError> {
    state.sessions.logout(&current.token).await?;
    tracing::info!(user_id = current.user.id, "User logged out");

    let jar = jar.remove(state.removal_cookie());
    Ok((jar, Json(ApiResponse::new(StatusResponse::ok()))))
}

/// GET /api/auth/me - The logged-in account.
pub async fn me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> std::result::Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let unread = NotificationService::new(&state.db)
        .unread_count(&current.user)
        .await?;
    Ok(Json(ApiResponse::new(MeResponse::new(&current.user, unread))))
}

/// POST /api/auth/password - Change password; other sessions are closed.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> std::result::Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    state
        .sessions
        .change_password(
            &current.user,
            current.session_id,
            &req.current_password,
            &req.new_password,
        )
        .await?;
    Ok(Json(ApiResponse::new(StatusResponse::ok())))
}
