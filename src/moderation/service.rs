//! Moderation service for Agora.
//!
//! Bans, reports and the moderation log. Community-scoped operations use the
//! caller's [`CommunityAccess`]; site-wide operations need the Admin role.

use tracing::info;

use super::ban::{Ban, BanRepository, NewBan};
use super::log::{ModLogEntry, ModLogRepository, NewModLogEntry};
use super::report::{Report, ReportRepository, ReportStatus};
use crate::auth::{require_admin, resolve_access, Action, CommunityAccess};
use crate::community::CommunityRepository;
use crate::datetime::sql_datetime_after_secs;
use crate::db::{Database, Role, User, UserRepository};
use crate::forum::{post_context, PaginatedResult, Pagination};
use crate::notification::NotificationService;
use crate::{AgoraError, Result};

/// Maximum length of a ban or report reason.
pub const MAX_REASON_LENGTH: usize = 500;

/// A request to ban a user.
#[derive(Debug, Clone)]
pub struct BanRequest {
    /// User to ban.
    pub user_id: i64,
    /// Community scope, or None for a global ban.
    pub community_id: Option<i64>,
    /// Reason shown to the user.
    pub reason: String,
    /// Ban length in seconds, or None for a permanent ban.
    pub duration_secs: Option<i64>,
}

fn validate_reason(reason: &str) -> Result<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AgoraError::Validation("reason cannot be empty".to_string()));
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(AgoraError::Validation(format!(
            "reason must be at most {MAX_REASON_LENGTH} characters"
        )));
    }
    Ok(reason.to_string())
}

/// Service for moderation operations.
pub struct ModerationService<'a> {
    db: &'a Database,
}

impl<'a> ModerationService<'a> {
    /// Create a new ModerationService.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Resolve the caller's access in a community and check an action.
    ///
    /// Returns None for site-wide scope, which requires Admin.
    async fn authorize(
        &self,
        actor: &User,
        community_id: Option<i64>,
        action: Action,
    ) -> Result<Option<CommunityAccess>> {
        let Some(community_id) = community_id else {
            require_admin(Some(actor))?;
            return Ok(None);
        };
        CommunityRepository::new(self.db.pool())
            .get_by_id(community_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("community".to_string()))?;

        let access = resolve_access(self.db.pool(), Some(actor), community_id).await?;
        access.check(action)?;
        Ok(Some(access))
    }

    /// Ban a user from a community or, for Admins, from the whole site.
    pub async fn ban_user(&self, actor: &User, request: &BanRequest) -> Result<Ban> {
        let access = self
            .authorize(actor, request.community_id, Action::BanUser)
            .await?;

        let target = UserRepository::new(self.db.pool())
            .get_by_id(request.user_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("user".to_string()))?;
        if target.id == actor.id {
            return Err(AgoraError::Validation("you cannot ban yourself".to_string()));
        }

        let (actor_role, target_role) = match (&access, request.community_id) {
            (Some(access), Some(community_id)) => {
                let target_access =
                    resolve_access(self.db.pool(), Some(&target), community_id).await?;
                (access.role, target_access.role.max(target.role))
            }
            _ => (actor.role, target.role),
        };
        if target_role >= actor_role {
            return Err(AgoraError::Permission(
                "cannot ban a user with an equal or higher role".to_string(),
            ));
        }

        let reason = validate_reason(&request.reason)?;
        let expires_at = match request.duration_secs {
            Some(secs) if secs <= 0 => {
                return Err(AgoraError::Validation(
                    "ban duration must be positive".to_string(),
                ))
            }
            Some(secs) => Some(sql_datetime_after_secs(secs)?),
            None => None,
        };

        let ban = BanRepository::new(self.db.pool())
            .create(&NewBan {
                user_id: target.id,
                community_id: request.community_id,
                reason: reason.clone(),
                banned_by: Some(actor.id),
                expires_at: expires_at.clone(),
            })
            .await?;

        ModLogRepository::new(self.db.pool())
            .append(&NewModLogEntry::user_action(
                request.community_id,
                actor.id,
                "ban_user",
                target.id,
                Some(reason.clone()),
            ))
            .await?;

        let scope = match request.community_id {
            Some(_) => "from this community",
            None => "from the site",
        };
        let until = expires_at
            .map(|e| format!(" until {e} UTC"))
            .unwrap_or_default();
        NotificationService::new(self.db)
            .notify_moderation(
                target.id,
                actor.id,
                None,
                None,
                &format!("You have been banned {scope}{until}: {reason}"),
            )
            .await?;

        info!(
            ban_id = ban.id,
            user_id = target.id,
            community_id = ?request.community_id,
            actor_id = actor.id,
            "User banned"
        );
        Ok(ban)
    }

    /// Lift an active ban early.
    pub async fn lift_ban(&self, actor: &User, ban_id: i64) -> Result<Ban> {
        let repo = BanRepository::new(self.db.pool());
        let ban = repo
            .get_by_id(ban_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("ban".to_string()))?;
        self.authorize(actor, ban.community_id, Action::BanUser)
            .await?;

        if !repo.lift(ban_id).await? {
            return Err(AgoraError::Conflict("ban is no longer active".to_string()));
        }

        ModLogRepository::new(self.db.pool())
            .append(&NewModLogEntry::new(
                ban.community_id,
                actor.id,
                "lift_ban",
                "ban",
                ban_id,
                None,
            ))
            .await?;

        info!(ban_id, user_id = ban.user_id, actor_id = actor.id, "Ban lifted");
        repo.get_by_id(ban_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("ban".to_string()))
    }

    /// List the active bans of a community, or the global bans for `None`.
    pub async fn list_bans(&self, actor: &User, community_id: Option<i64>) -> Result<Vec<Ban>> {
        self.authorize(actor, community_id, Action::BanUser).await?;
        BanRepository::new(self.db.pool())
            .list_active(community_id)
            .await
    }

    /// Report a post to the moderators of its community.
    pub async fn report_post(&self, reporter: &User, post_id: i64, reason: &str) -> Result<Report> {
        let ctx = post_context(self.db, post_id, Some(reporter)).await?;
        ctx.access.check_board(&ctx.board, Action::Report)?;
        if ctx.post.is_deleted {
            return Err(AgoraError::Validation(
                "deleted posts cannot be reported".to_string(),
            ));
        }

        let reason = validate_reason(reason)?;
        let report = ReportRepository::new(self.db.pool())
            .create(post_id, reporter.id, &reason)
            .await?;

        info!(report_id = report.id, post_id, reporter_id = reporter.id, "Post reported");
        Ok(report)
    }

    /// List reports of a community.
    pub async fn list_reports(
        &self,
        actor: &User,
        community_id: i64,
        status: Option<ReportStatus>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Report>> {
        self.authorize(actor, Some(community_id), Action::ViewReports)
            .await?;

        let repo = ReportRepository::new(self.db.pool());
        let total = repo.count_by_community(community_id, status).await?;
        let items = repo
            .list_by_community(community_id, status, pagination.offset, pagination.limit)
            .await?;
        Ok(PaginatedResult::new(items, total, pagination))
    }

    /// Mark a report as resolved.
    pub async fn resolve_report(&self, actor: &User, report_id: i64) -> Result<Report> {
        self.close_report(actor, report_id, ReportStatus::Resolved)
            .await
    }

    /// Dismiss a report.
    pub async fn dismiss_report(&self, actor: &User, report_id: i64) -> Result<Report> {
        self.close_report(actor, report_id, ReportStatus::Dismissed)
            .await
    }

    async fn close_report(
        &self,
        actor: &User,
        report_id: i64,
        status: ReportStatus,
    ) -> Result<Report> {
        let repo = ReportRepository::new(self.db.pool());
        let report = repo
            .get_by_id(report_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("report".to_string()))?;
        self.authorize(actor, Some(report.community_id), Action::ResolveReports)
            .await?;

        if !repo.close(report_id, status, actor.id).await? {
            return Err(AgoraError::Conflict("report is already closed".to_string()));
        }

        let action = match status {
            ReportStatus::Dismissed => "dismiss_report",
            _ => "resolve_report",
        };
        ModLogRepository::new(self.db.pool())
            .append(&NewModLogEntry::new(
                Some(report.community_id),
                actor.id,
                action,
                "report",
                report_id,
                None,
            ))
            .await?;

        info!(report_id, status = %status, actor_id = actor.id, "Report closed");
        repo.get_by_id(report_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("report".to_string()))
    }

    /// Read the moderation log of a community, or the site-wide log for `None`.
    pub async fn mod_log(
        &self,
        actor: &User,
        community_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<ModLogEntry>> {
        self.authorize(actor, community_id, Action::ViewModLog)
            .await?;

        let repo = ModLogRepository::new(self.db.pool());
        let total = repo.count_by_community(community_id).await?;
        let items = repo
            .list_by_community(community_id, pagination.offset, pagination.limit)
            .await?;
        Ok(PaginatedResult::new(items, total, pagination))
    }
}

/// Service for site administration of user accounts.
pub struct AdminService<'a> {
    db: &'a Database,
}

impl<'a> AdminService<'a> {
    /// Create a new AdminService.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Administrators cannot change their own role or status; that keeps at
    /// least one active admin.
    async fn load_target(&self, admin: &User, user_id: i64) -> Result<User> {
        require_admin(Some(admin))?;
        if admin.id == user_id {
            return Err(AgoraError::Validation(
                "administrators cannot change their own account here".to_string(),
            ));
        }
        UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("user".to_string()))
    }

    /// Change a user's global role.
    pub async fn set_role(&self, admin: &User, user_id: i64, role: Role) -> Result<User> {
        self.load_target(admin, user_id).await?;

        let user = UserRepository::new(self.db.pool())
            .update(user_id, &crate::db::UserUpdate::new().role(role))
            .await?
            .ok_or_else(|| AgoraError::NotFound("user".to_string()))?;

        ModLogRepository::new(self.db.pool())
            .append(&NewModLogEntry::user_action(
                None,
                admin.id,
                "set_role",
                user_id,
                Some(role.as_str().to_string()),
            ))
            .await?;

        info!(user_id, role = role.as_str(), admin_id = admin.id, "Role changed");
        Ok(user)
    }

    /// Activate or deactivate an account. Deactivation ends its sessions.
    pub async fn set_active(&self, admin: &User, user_id: i64, active: bool) -> Result<User> {
        self.load_target(admin, user_id).await?;

        let user = UserRepository::new(self.db.pool())
            .update(user_id, &crate::db::UserUpdate::new().is_active(active))
            .await?
            .ok_or_else(|| AgoraError::NotFound("user".to_string()))?;

        if !active {
            crate::db::SessionRepository::new(self.db.pool())
                .delete_for_user(user_id)
                .await?;
        }

        let action = if active { "activate_user" } else { "deactivate_user" };
        ModLogRepository::new(self.db.pool())
            .append(&NewModLogEntry::user_action(None, admin.id, action, user_id, None))
            .await?;

        info!(user_id, active, admin_id = admin.id, "Account status changed");
        Ok(user)
    }

    /// List users by username.
    pub async fn list_users(&self, admin: &User, pagination: Pagination) -> Result<PaginatedResult<User>> {
        require_admin(Some(admin))?;
        let repo = UserRepository::new(self.db.pool());
        let total = repo.count().await?;
        let items = repo.list(pagination.offset, pagination.limit).await?;
        Ok(PaginatedResult::new(items, total, pagination))
    }
}
