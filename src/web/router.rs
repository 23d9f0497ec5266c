//! Router configuration for the HTTP API.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    admin, attachment, auth, board, community, moderation, notification, post as posts,
    search, site, thread, user, AppState,
};
use super::middleware::{
    api_rate_limit, create_cors_layer, login_rate_limit, security_headers, RateLimitState,
};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Create the API router with rate limiters built from the web config.
pub fn create_router(state: Arc<AppState>) -> Router {
    let limits = Arc::new(RateLimitState::new(
        state.config.web.login_rate_limit,
        state.config.web.api_rate_limit,
    ));
    create_router_with_limits(state, limits)
}

/// Create the API router around shared rate limiters.
pub fn create_router_with_limits(state: Arc<AppState>, limits: Arc<RateLimitState>) -> Router {
    let upload_limit =
        usize::try_from(state.config.attachments.max_upload_bytes() + MULTIPART_OVERHEAD)
            .unwrap_or(usize::MAX);
    let cors = create_cors_layer(&state.config.web.cors_origins);

    let auth_routes = Router::new()
        .route(
            "/login",
            post(auth::login).route_layer(middleware::from_fn_with_state(
                limits.clone(),
                login_rate_limit,
            )),
        )
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/password", post(auth::change_password));

    let user_routes = Router::new()
        .route("/me", put(user::update_me))
        .route("/:username", get(user::get_user));

    let community_routes = Router::new()
        .route(
            "/",
            get(community::list_communities).post(community::create_community),
        )
        .route("/:slug", get(community::get_community))
        .route("/:slug/categories", post(community::create_category))
        .route("/:slug/boards", post(community::create_board))
        .route(
            "/:slug/moderators",
            get(community::list_moderators).post(community::add_moderator),
        )
        .route(
            "/:slug/moderators/:user_id",
            delete(community::remove_moderator),
        )
        .route("/:slug/reports", get(moderation::list_reports))
        .route(
            "/:slug/bans",
            get(moderation::list_bans).post(moderation::ban_in_community),
        )
        .route("/:slug/modlog", get(moderation::community_mod_log));

    let board_routes = Router::new()
        .route("/:id", get(board::get_board).put(board::update_board))
        .route(
            "/:id/threads",
            get(board::list_threads).post(board::create_thread),
        );

    let thread_routes = Router::new()
        .route("/:id", get(thread::get_thread).delete(thread::delete_thread))
        .route("/:id/posts", get(thread::list_posts).post(thread::reply))
        .route("/:id/lock", post(thread::lock_thread))
        .route("/:id/unlock", post(thread::unlock_thread))
        .route("/:id/sticky", post(thread::sticky_thread))
        .route("/:id/unsticky", post(thread::unsticky_thread))
        .route("/:id/move", post(thread::move_thread));

    let post_routes = Router::new()
        .route(
            "/:id",
            get(posts::get_post)
                .put(posts::edit_post)
                .delete(posts::delete_post),
        )
        .route(
            "/:id/reactions",
            get(posts::get_reactions).post(posts::toggle_reaction),
        )
        .route("/:id/report", post(posts::report_post))
        .route(
            "/:id/attachments",
            get(posts::list_attachments)
                .post(posts::upload_attachment)
                .layer(DefaultBodyLimit::max(upload_limit)),
        );

    let notification_routes = Router::new()
        .route("/", get(notification::list_notifications))
        .route("/read-all", post(notification::mark_all_read))
        .route("/:id/read", post(notification::mark_read));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/:id/role", put(admin::set_role))
        .route("/users/:id/active", put(admin::set_active))
        .route(
            "/bans",
            get(moderation::list_global_bans).post(moderation::admin_ban),
        )
        .route("/modlog", get(moderation::site_mod_log));

    let api_routes = Router::new()
        .route("/health", get(site::health))
        .route("/bbcode/preview", post(site::preview))
        .route("/search", get(search::search))
        .route("/categories/:id", put(community::update_category))
        .route("/reports/:id/resolve", post(moderation::resolve_report))
        .route("/reports/:id/dismiss", post(moderation::dismiss_report))
        .route("/bans/:id", delete(moderation::lift_ban))
        .route("/attachments/:id", get(attachment::download_attachment))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/communities", community_routes)
        .nest("/boards", board_routes)
        .nest("/threads", thread_routes)
        .nest("/posts", post_routes)
        .nest("/notifications", notification_routes)
        .nest("/admin", admin_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn_with_state(limits, api_rate_limit)),
        )
        .with_state(state)
}
