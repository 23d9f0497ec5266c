//! Moderation for Agora.
//!
//! Bans (community-scoped or global), user reports on posts, the
//! moderation log, and site administration of user accounts.

mod ban;
mod log;
mod report;
mod service;

pub use ban::{Ban, BanRepository, NewBan};
pub use log::{ModLogEntry, ModLogRepository, NewModLogEntry};
pub use report::{Report, ReportRepository, ReportStatus};
pub use service::{AdminService, BanRequest, ModerationService, MAX_REASON_LENGTH};
