//! HTTP server for Agora.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::auth::SessionService;
use crate::{AgoraError, Config, Database, Result};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::create_router_with_limits;

/// Session cleanup interval: 1 hour.
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Web server for the API.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    limits: Arc<RateLimitState>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| AgoraError::Config(format!("invalid server address: {e}")))?;

        let limits = Arc::new(RateLimitState::new(
            config.web.login_rate_limit,
            config.web.api_rate_limit,
        ));
        let app_state = Arc::new(AppState::new(db, config)?);
        tracing::info!(
            path = %app_state.config.attachments.storage_path,
            "Attachment storage ready"
        );

        Ok(Self {
            addr,
            app_state,
            limits,
        })
    }

    /// Get the configured address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Remove expired sessions every hour.
    fn start_session_cleanup_task(sessions: Arc<SessionService>) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;
                match sessions.cleanup_expired().await {
                    Ok(0) => tracing::debug!("No expired sessions to clean up"),
                    Ok(count) => {
                        tracing::info!(deleted_count = count, "Cleaned up expired sessions")
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to cleanup sessions"),
                }
            }
        });
    }

    fn build_router(&self) -> Router {
        create_router_with_limits(self.app_state.clone(), self.limits.clone())
            .layer(CompressionLayer::new())
    }

    async fn bind(&self) -> std::io::Result<(TcpListener, Router)> {
        let listener = TcpListener::bind(self.addr).await?;
        let router = self.build_router();

        // Start background tasks after a successful bind
        Self::start_session_cleanup_task(self.app_state.sessions.clone());
        self.limits.clone().start_cleanup_task();

        tracing::info!("Web server listening on http://{}", listener.local_addr()?);
        Ok((listener, router))
    }

    /// Run the web server until Ctrl-C.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
