//! Notification storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::Result;

/// What caused a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// The user was `@mentioned` in a post.
    Mention,
    /// Someone replied to the user's thread.
    Reply,
    /// A moderator acted on the user or their content.
    Moderation,
}

impl NotificationKind {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Mention => "mention",
            NotificationKind::Reply => "reply",
            NotificationKind::Moderation => "moderation",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mention" => Ok(NotificationKind::Mention),
            "reply" => Ok(NotificationKind::Reply),
            "moderation" => Ok(NotificationKind::Moderation),
            _ => Err(format!("unknown notification kind: {s}")),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification delivered to one user.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: i64,
    /// Recipient.
    pub user_id: i64,
    pub kind: NotificationKind,
    /// User who triggered it, if the account still exists.
    pub actor_id: Option<i64>,
    pub actor_username: Option<String>,
    pub thread_id: Option<i64>,
    pub post_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    user_id: i64,
    kind: String,
    actor_id: Option<i64>,
    actor_username: Option<String>,
    thread_id: Option<i64>,
    post_id: Option<i64>,
    message: String,
    is_read: bool,
    created_at: String,
}

impl NotificationRow {
    fn into_notification(self) -> Notification {
        Notification {
            id: self.id,
            user_id: self.user_id,
            kind: self.kind.parse().unwrap_or(NotificationKind::Moderation),
            actor_id: self.actor_id,
            actor_username: self.actor_username,
            thread_id: self.thread_id,
            post_id: self.post_id,
            message: self.message,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

/// Data for a new notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationKind,
    pub actor_id: Option<i64>,
    pub thread_id: Option<i64>,
    pub post_id: Option<i64>,
    pub message: String,
}

impl NewNotification {
    /// Create a notification for a user.
    pub fn new(user_id: i64, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            actor_id: None,
            thread_id: None,
            post_id: None,
            message: message.into(),
        }
    }

    /// Set the acting user.
    pub fn with_actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Link the notification to a thread and optionally a post.
    pub fn with_target(mut self, thread_id: Option<i64>, post_id: Option<i64>) -> Self {
        self.thread_id = thread_id;
        self.post_id = post_id;
        self
    }
}

const NOTIFICATION_SELECT: &str = "SELECT n.id, n.user_id, n.kind, n.actor_id, u.username AS actor_username,
        n.thread_id, n.post_id, n.message, n.is_read, n.created_at
     FROM notifications n
     LEFT JOIN users u ON u.id = n.actor_id";

/// Repository for notifications.
pub struct NotificationRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new NotificationRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a notification, returning its ID.
    pub async fn create(&self, notification: &NewNotification) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO notifications (user_id, kind, actor_id, thread_id, post_id, message)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(notification.actor_id)
        .bind(notification.thread_id)
        .bind(notification.post_id)
        .bind(&notification.message)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Get a notification by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Notification>> {
        let sql = format!("{NOTIFICATION_SELECT} WHERE n.id = ?");
        let row: Option<NotificationRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(NotificationRow::into_notification))
    }

    /// List a user's notifications, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>> {
        let sql = format!(
            "{NOTIFICATION_SELECT} WHERE n.user_id = ? AND (? = 0 OR n.is_read = 0)
             ORDER BY n.created_at DESC, n.id DESC
             LIMIT ? OFFSET ?"
        );
        let rows: Vec<NotificationRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(NotificationRow::into_notification)
            .collect())
    }

    /// Count a user's notifications.
    pub async fn count_for_user(&self, user_id: i64, unread_only: bool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND (? = 0 OR is_read = 0)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Count unread notifications.
    pub async fn unread_count(&self, user_id: i64) -> Result<i64> {
        self.count_for_user(user_id, true).await
    }

    /// Mark one notification as read. Returns false if it does not belong to the user.
    pub async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark every notification of a user as read, returning how many changed.
    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
