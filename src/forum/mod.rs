//! Threads and posts for Agora.
//!
//! Boards contain threads, threads contain an ordered sequence of posts.
//! [`ForumService`] applies the per-community permission rules on top of
//! the repositories.

mod context;
mod post;
mod post_repository;
mod service;
mod thread;
mod thread_repository;

pub use context::{
    board_context, post_context, thread_context, BoardContext, PostContext, ThreadContext,
};
pub use post::{NewPost, Post};
pub use post_repository::PostRepository;
pub use service::{ForumService, PaginatedResult, Pagination, MAX_PER_PAGE};
pub use thread::{NewThread, Thread};
pub use thread_repository::ThreadRepository;
