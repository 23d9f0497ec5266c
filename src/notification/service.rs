//! Notification service for Agora.
//!
//! Delivers mention, reply and moderation notifications and lets users
//! read and acknowledge them.

use std::collections::HashSet;

use tracing::debug;

use super::mention::extract_mentions;
use super::repository::{NewNotification, Notification, NotificationKind, NotificationRepository};
use crate::auth::resolve_access;
use crate::bbcode;
use crate::community::Board;
use crate::db::{Database, User, UserRepository};
use crate::forum::{PaginatedResult, Pagination, Post, Thread};
use crate::{AgoraError, Result};

/// Length of the post excerpt quoted in mention messages.
const EXCERPT_CHARS: usize = 100;

/// Service for notification operations.
pub struct NotificationService<'a> {
    db: &'a Database,
}

impl<'a> NotificationService<'a> {
    /// Create a new NotificationService.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Notify users mentioned in a post.
    ///
    /// With `previous_body` set (an edit), only names that were not already
    /// mentioned before are notified. The author, unknown or inactive users
    /// and users who cannot read the board are skipped.
    ///
    /// Returns the IDs of the notified users.
    pub async fn notify_mentions(
        &self,
        board: &Board,
        thread: &Thread,
        post: &Post,
        author: &User,
        previous_body: Option<&str>,
    ) -> Result<Vec<i64>> {
        let already: HashSet<String> = previous_body
            .map(extract_mentions)
            .unwrap_or_default()
            .into_iter()
            .map(|name| name.to_lowercase())
            .collect();
        let names: Vec<String> = extract_mentions(&post.body_raw)
            .into_iter()
            .filter(|name| !already.contains(&name.to_lowercase()))
            .collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let pool = self.db.pool();
        let users = UserRepository::new(pool)
            .get_active_by_usernames(&names)
            .await?;
        let repo = NotificationRepository::new(pool);
        let message = format!(
            "{} mentioned you in \"{}\": {}",
            author.display_name,
            thread.title,
            bbcode::excerpt(&post.body_raw, EXCERPT_CHARS)
        );

        let mut notified = Vec::new();
        for user in users {
            if user.id == author.id {
                continue;
            }
            let access = resolve_access(pool, Some(&user), board.community_id).await?;
            if !access.can_read_board(board) {
                continue;
            }
            repo.create(
                &NewNotification::new(user.id, NotificationKind::Mention, message.clone())
                    .with_actor(author.id)
                    .with_target(Some(thread.id), Some(post.id)),
            )
            .await?;
            notified.push(user.id);
        }

        if !notified.is_empty() {
            debug!(post_id = post.id, count = notified.len(), "Mention notifications sent");
        }
        Ok(notified)
    }

    /// Notify a thread's author about a reply.
    ///
    /// Nothing is sent for self-replies or when the author was already
    /// notified about this post (e.g. by a mention). Returns whether a
    /// notification was created.
    pub async fn notify_reply(
        &self,
        thread: &Thread,
        post: &Post,
        author: &User,
        already_notified: &[i64],
    ) -> Result<bool> {
        if thread.author_id == author.id || already_notified.contains(&thread.author_id) {
            return Ok(false);
        }

        let message = format!("{} replied to \"{}\"", author.display_name, thread.title);
        NotificationRepository::new(self.db.pool())
            .create(
                &NewNotification::new(thread.author_id, NotificationKind::Reply, message)
                    .with_actor(author.id)
                    .with_target(Some(thread.id), Some(post.id)),
            )
            .await?;
        Ok(true)
    }

    /// Tell a user about a moderation action affecting them.
    pub async fn notify_moderation(
        &self,
        user_id: i64,
        actor_id: i64,
        thread_id: Option<i64>,
        post_id: Option<i64>,
        message: &str,
    ) -> Result<()> {
        NotificationRepository::new(self.db.pool())
            .create(
                &NewNotification::new(user_id, NotificationKind::Moderation, message)
                    .with_actor(actor_id)
                    .with_target(thread_id, post_id),
            )
            .await?;
        Ok(())
    }

    /// List a user's notifications, newest first.
    pub async fn list(
        &self,
        user: &User,
        unread_only: bool,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Notification>> {
        let repo = NotificationRepository::new(self.db.pool());
        let items = repo
            .list_for_user(user.id, unread_only, pagination.offset, pagination.limit)
            .await?;
        let total = repo.count_for_user(user.id, unread_only).await?;
        Ok(PaginatedResult::new(items, total, pagination))
    }

    /// Number of unread notifications.
    pub async fn unread_count(&self, user: &User) -> Result<i64> {
        NotificationRepository::new(self.db.pool())
            .unread_count(user.id)
            .await
    }

    /// Mark one of the user's notifications as read.
    pub async fn mark_read(&self, user: &User, notification_id: i64) -> Result<()> {
        let updated = NotificationRepository::new(self.db.pool())
            .mark_read(notification_id, user.id)
            .await?;
        if !updated {
            return Err(AgoraError::NotFound("notification".to_string()));
        }
        Ok(())
    }

    /// Mark all of the user's notifications as read.
    pub async fn mark_all_read(&self, user: &User) -> Result<u64> {
        NotificationRepository::new(self.db.pool())
            .mark_all_read(user.id)
            .await
    }
}
