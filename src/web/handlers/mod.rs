//! HTTP handlers, one module per resource.

pub mod admin;
pub mod attachment;
pub mod auth;
pub mod board;
pub mod community;
pub mod moderation;
pub mod notification;
pub mod post;
pub mod search;
pub mod site;
pub mod thread;
pub mod user;

pub use auth::AppState;
