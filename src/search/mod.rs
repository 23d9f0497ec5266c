//! Full-text search for Agora.
//!
//! Posts are indexed in the SQLite FTS5 table `posts_fts`, which database
//! triggers keep in sync with post writes and deletions.

mod query;
mod service;

pub use query::{build_match_query, MAX_TERMS};
pub use service::{SearchHit, SearchQuery, SearchService};
