//! Post reactions for Agora.

mod repository;
mod service;

pub use repository::{ReactionKind, ReactionRepository};
pub use service::{ReactionService, ReactionSummary};
