//! Reaction storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::Result;

/// Kinds of reaction a user can leave on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Laugh,
    Thanks,
    Insightful,
    Sad,
}

impl ReactionKind {
    /// Every kind, in display order.
    pub const ALL: [ReactionKind; 6] = [
        ReactionKind::Like,
        ReactionKind::Love,
        ReactionKind::Laugh,
        ReactionKind::Thanks,
        ReactionKind::Insightful,
        ReactionKind::Sad,
    ];

    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Love => "love",
            ReactionKind::Laugh => "laugh",
            ReactionKind::Thanks => "thanks",
            ReactionKind::Insightful => "insightful",
            ReactionKind::Sad => "sad",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        ReactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| format!("unknown reaction: {s}"))
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository for reactions.
pub struct ReactionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ReactionRepository<'a> {
    /// Create a new ReactionRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Add the reaction if absent, remove it if present.
    ///
    /// Returns true if the reaction now exists.
    pub async fn toggle(&self, post_id: i64, user_id: i64, kind: ReactionKind) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM reactions WHERE post_id = ? AND user_id = ? AND kind = ?")
            .bind(post_id)
            .bind(user_id)
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query("INSERT INTO reactions (post_id, user_id, kind) VALUES (?, ?, ?)")
                .bind(post_id)
                .bind(user_id)
                .bind(kind.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(removed == 0)
    }

    /// Count reactions on a post by kind. Kinds with no reactions are omitted.
    pub async fn counts(&self, post_id: i64) -> Result<Vec<(ReactionKind, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT kind, COUNT(*) FROM reactions WHERE post_id = ? GROUP BY kind",
        )
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;

        let mut counts: Vec<(ReactionKind, i64)> = rows
            .into_iter()
            .filter_map(|(kind, count)| kind.parse().ok().map(|kind| (kind, count)))
            .collect();
        counts.sort_by_key(|(kind, _)| *kind);
        Ok(counts)
    }

    /// Kinds a user has left on a post.
    pub async fn kinds_by_user(&self, post_id: i64, user_id: i64) -> Result<Vec<ReactionKind>> {
        let kinds: Vec<String> =
            sqlx::query_scalar("SELECT kind FROM reactions WHERE post_id = ? AND user_id = ?")
                .bind(post_id)
                .bind(user_id)
                .fetch_all(self.pool)
                .await?;

        let mut kinds: Vec<ReactionKind> = kinds.iter().filter_map(|k| k.parse().ok()).collect();
        kinds.sort();
        Ok(kinds)
    }
}
