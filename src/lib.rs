//! Agora - a multi-community discussion forum engine.
//!
//! Communities hold categories of boards; boards hold threads of BBCode
//! posts. Moderation, reactions, mentions, attachments and full-text search
//! sit on top, exposed through an HTTP/JSON API.

pub mod attachment;
pub mod auth;
pub mod bbcode;
pub mod community;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod forum;
pub mod logging;
pub mod moderation;
pub mod notification;
pub mod reaction;
pub mod search;
pub mod web;

pub use auth::{
    check_permission, hash_password, register, resolve_access, verify_password, Action,
    CommunityAccess, PermissionError, SessionService,
};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository, UserUpdate};
pub use error::{AgoraError, Result};
pub use forum::{ForumService, PaginatedResult, Pagination};
pub use web::{create_router, ApiError, WebServer};
