//! Community module for Agora.
//!
//! A community owns categories, each category groups boards, and every
//! community has its own moderators.

mod moderator;
mod repository;
mod service;
mod types;

pub use moderator::CommunityModeratorRepository;
pub use repository::{BoardRepository, CategoryRepository, CommunityRepository};
pub use service::{CategoryWithBoards, CommunityOverview, CommunityService};
pub use types::{
    is_valid_slug, Board, BoardUpdate, Category, Community, CommunityModerator, NewBoard,
    NewCategory, NewCommunity, MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH, MAX_SLUG_LENGTH,
    MIN_SLUG_LENGTH,
};
