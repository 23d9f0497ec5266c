//! Configuration module for Agora.

use serde::Deserialize;
use std::path::Path;

use crate::{AgoraError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/agora.db".to_string()
}

fn default_max_connections() -> u32 {
    8
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Forum-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// Name of the site.
    #[serde(default = "default_forum_name")]
    pub name: String,
    /// Description of the site.
    #[serde(default = "default_forum_description")]
    pub description: String,
    /// Posts shown per thread page.
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u32,
    /// Threads shown per board page.
    #[serde(default = "default_threads_per_page")]
    pub threads_per_page: u32,
    /// Maximum thread title length in characters.
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    /// Maximum post body length in characters.
    #[serde(default = "default_max_body_length")]
    pub max_body_length: usize,
    /// Seconds after posting during which authors may edit (0 = no limit).
    #[serde(default)]
    pub edit_window_secs: i64,
}

fn default_forum_name() -> String {
    "Agora".to_string()
}

fn default_forum_description() -> String {
    "A place for communities to talk".to_string()
}

fn default_posts_per_page() -> u32 {
    20
}

fn default_threads_per_page() -> u32 {
    25
}

fn default_max_title_length() -> usize {
    120
}

fn default_max_body_length() -> usize {
    20_000
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            name: default_forum_name(),
            description: default_forum_description(),
            posts_per_page: default_posts_per_page(),
            threads_per_page: default_threads_per_page(),
            max_title_length: default_max_title_length(),
            max_body_length: default_max_body_length(),
            edit_window_secs: 0,
        }
    }
}

/// Attachment storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentsConfig {
    /// Path to the attachment storage directory.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// File extensions accepted for upload (lowercase, without dot).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Maximum number of attachments per post.
    #[serde(default = "default_max_per_post")]
    pub max_per_post: i64,
}

fn default_storage_path() -> String {
    "data/attachments".to_string()
}

fn default_max_upload_size() -> u64 {
    8
}

fn default_allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webp", "txt", "pdf", "zip"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_per_post() -> i64 {
    5
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
            allowed_extensions: default_allowed_extensions(),
            max_per_post: default_max_per_post(),
        }
    }
}

impl AttachmentsConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Session lifetime in hours.
    #[serde(default = "default_session_ttl")]
    pub ttl_hours: u64,
    /// Whether to set the Secure attribute on the cookie.
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_cookie_name() -> String {
    "agora_session".to_string()
}

/// Longest allowed session lifetime, ten years.
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 10;

fn default_session_ttl() -> u64 {
    24 * 14
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_hours: default_session_ttl(),
            secure_cookie: false,
        }
    }
}

/// Full-text search configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of ranked candidates fetched before permission filtering.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: i64,
    /// Default number of hits per page.
    #[serde(default = "default_search_limit")]
    pub default_limit: u32,
}

fn default_max_candidates() -> i64 {
    500
}

fn default_search_limit() -> u32 {
    20
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            default_limit: default_search_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/agora.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web layer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Rate limit for login endpoint (requests per minute).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for general API endpoints (requests per minute).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_login_rate_limit() -> u32 {
    10
}

fn default_api_rate_limit() -> u32 {
    300
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            login_rate_limit: default_login_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Forum settings.
    #[serde(default)]
    pub forum: ForumConfig,
    /// Attachment settings.
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Search settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Web layer settings.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(AgoraError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| AgoraError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `AGORA_DATABASE_PATH`: Override the database path
    /// - `AGORA_PORT`: Override the listening port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("AGORA_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(port) = std::env::var("AGORA_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid AGORA_PORT"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.forum.posts_per_page == 0 || self.forum.threads_per_page == 0 {
            return Err(AgoraError::Config(
                "posts_per_page and threads_per_page must be positive".to_string(),
            ));
        }
        if self.forum.max_title_length == 0 || self.forum.max_body_length == 0 {
            return Err(AgoraError::Config(
                "max_title_length and max_body_length must be positive".to_string(),
            ));
        }
        if self.session.cookie_name.is_empty() {
            return Err(AgoraError::Config("session cookie_name is empty".to_string()));
        }
        if self.session.ttl_hours == 0 || self.session.ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(AgoraError::Config(format!(
                "session ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(AgoraError::Config(
                "database max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
