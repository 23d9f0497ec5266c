//! HTTP/JSON API for Agora.
//!
//! Sessions travel in an HttpOnly cookie or an `Authorization: Bearer`
//! header; every response is JSON except attachment downloads.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_router, create_router_with_limits};
pub use server::WebServer;
