//! Reaction service for Agora.

use tracing::debug;

use super::repository::{ReactionKind, ReactionRepository};
use crate::auth::Action;
use crate::db::{Database, User};
use crate::forum::post_context;
use crate::{AgoraError, Result};

/// Reactions on one post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionSummary {
    /// Count per kind, in display order. Kinds with no reactions are omitted.
    pub counts: Vec<(ReactionKind, i64)>,
    /// Kinds the viewer has left. Empty for guests.
    pub mine: Vec<ReactionKind>,
}

impl ReactionSummary {
    /// Count for a single kind.
    pub fn count(&self, kind: ReactionKind) -> i64 {
        self.counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

/// Service for reaction operations.
pub struct ReactionService<'a> {
    db: &'a Database,
}

impl<'a> ReactionService<'a> {
    /// Create a new ReactionService.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Toggle a reaction on a post. Returns true if the reaction is now set.
    pub async fn toggle(&self, post_id: i64, user: &User, kind: ReactionKind) -> Result<bool> {
        let ctx = post_context(self.db, post_id, Some(user)).await?;
        ctx.access.check_board(&ctx.board, Action::React)?;
        if ctx.post.is_deleted {
            return Err(AgoraError::Validation(
                "cannot react to a deleted post".to_string(),
            ));
        }

        let active = ReactionRepository::new(self.db.pool())
            .toggle(post_id, user.id, kind)
            .await?;
        debug!(post_id, user_id = user.id, kind = %kind, active, "Reaction toggled");
        Ok(active)
    }

    /// Reaction counts for a post, plus the viewer's own reactions.
    pub async fn summary(&self, post_id: i64, viewer: Option<&User>) -> Result<ReactionSummary> {
        let ctx = post_context(self.db, post_id, viewer).await?;
        ctx.access.check_board(&ctx.board, Action::ViewBoard)?;

        let repo = ReactionRepository::new(self.db.pool());
        let counts = repo.counts(post_id).await?;
        let mine = match viewer {
            Some(user) => repo.kinds_by_user(post_id, user.id).await?,
            None => Vec::new(),
        };
        Ok(ReactionSummary { counts, mine })
    }
}
