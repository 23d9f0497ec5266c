//! Notifications for Agora.
//!
//! Users are notified when they are `@mentioned`, when someone replies to
//! their thread, and when a moderator acts on them or their posts.

mod mention;
mod repository;
mod service;

pub use mention::{extract_mentions, MAX_MENTIONS};
pub use repository::{NewNotification, Notification, NotificationKind, NotificationRepository};
pub use service::NotificationService;
