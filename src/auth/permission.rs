//! Permission checking for Agora.
//!
//! Global checks compare a user's site-wide role against a required role.
//! Community checks go through [`CommunityAccess`], which folds community
//! moderatorship, bans and account state into one effective view.

use thiserror::Error;

use crate::community::{Board, CommunityModeratorRepository};
use crate::db::{DbPool, Role, User};
use crate::moderation::BanRepository;
use crate::Result;

/// Permission-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// User role is below what the operation requires.
    #[error("this action requires {0} access")]
    InsufficientRole(String),

    /// Login required.
    #[error("you must be logged in to do this")]
    NotAuthenticated,

    /// User account is not active.
    #[error("account is inactive")]
    AccountInactive,

    /// User is banned in this scope.
    #[error("you are banned: {0}")]
    Banned(String),
}

/// Something a user may try to do inside a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewBoard,
    CreateThread,
    Reply,
    EditOwnPost,
    DeleteOwnPost,
    React,
    Report,
    UploadAttachment,
    ReplyToLocked,
    EditAnyPost,
    DeleteAnyPost,
    LockThread,
    StickyThread,
    MoveThread,
    DeleteThread,
    ViewReports,
    ResolveReports,
    BanUser,
    ViewModLog,
    ManageCommunity,
    ManageUsers,
}

impl Action {
    /// Minimum effective role for the action.
    pub fn required_role(self) -> Role {
        match self {
            Action::ViewBoard => Role::Guest,
            Action::CreateThread
            | Action::Reply
            | Action::EditOwnPost
            | Action::DeleteOwnPost
            | Action::React
            | Action::Report
            | Action::UploadAttachment => Role::Member,
            Action::ReplyToLocked
            | Action::EditAnyPost
            | Action::DeleteAnyPost
            | Action::LockThread
            | Action::StickyThread
            | Action::MoveThread
            | Action::DeleteThread
            | Action::ViewReports
            | Action::ResolveReports
            | Action::BanUser
            | Action::ViewModLog => Role::Moderator,
            Action::ManageCommunity | Action::ManageUsers => Role::Admin,
        }
    }

    /// Whether the action changes state. Bans block every such action.
    pub fn is_write(self) -> bool {
        !matches!(
            self,
            Action::ViewBoard | Action::ViewReports | Action::ViewModLog
        )
    }

    /// Whether the action adds content to a board and so needs `min_write_role`.
    pub fn posts_content(self) -> bool {
        matches!(
            self,
            Action::CreateThread
                | Action::Reply
                | Action::ReplyToLocked
                | Action::EditOwnPost
                | Action::UploadAttachment
        )
    }
}

/// A user's effective permissions inside one community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityAccess {
    /// Acting user, or None for guests.
    pub user_id: Option<i64>,
    /// Community the access was resolved for.
    pub community_id: i64,
    /// Effective role: global role, raised by community moderatorship.
    pub role: Role,
    /// Whether the user moderates this community specifically.
    pub is_community_moderator: bool,
    /// Reason of the active ban covering this community, if any.
    pub ban_reason: Option<String>,
    /// Whether the account is deactivated.
    pub inactive: bool,
}

impl CommunityAccess {
    /// Access for an anonymous visitor.
    pub fn guest(community_id: i64) -> Self {
        Self {
            user_id: None,
            community_id,
            role: Role::Guest,
            is_community_moderator: false,
            ban_reason: None,
            inactive: false,
        }
    }

    /// Build access from already-loaded facts about a user.
    pub fn for_user(
        user: &User,
        community_id: i64,
        is_community_moderator: bool,
        ban_reason: Option<String>,
    ) -> Self {
        if !user.is_active {
            return Self {
                user_id: Some(user.id),
                inactive: true,
                ..Self::guest(community_id)
            };
        }

        let role = if is_community_moderator {
            user.role.max(Role::Moderator)
        } else {
            user.role
        };

        Self {
            user_id: Some(user.id),
            community_id,
            role,
            is_community_moderator,
            ban_reason,
            inactive: false,
        }
    }

    /// Whether the effective role is Moderator or above.
    pub fn is_moderator(&self) -> bool {
        self.role >= Role::Moderator
    }

    /// Whether an active ban covers this community.
    pub fn is_banned(&self) -> bool {
        self.ban_reason.is_some()
    }

    /// Whether the acting user is the given user.
    pub fn is_user(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }

    /// Check an action against the rule table.
    pub fn check(&self, action: Action) -> std::result::Result<(), PermissionError> {
        let required = action.required_role();

        if self.inactive && action != Action::ViewBoard {
            return Err(PermissionError::AccountInactive);
        }
        if required > Role::Guest && self.user_id.is_none() {
            return Err(PermissionError::NotAuthenticated);
        }
        if action.is_write() {
            if let Some(reason) = &self.ban_reason {
                return Err(PermissionError::Banned(reason.clone()));
            }
        }
        if !self.role.can_access(required) {
            return Err(PermissionError::InsufficientRole(
                required.display_name().to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the action is allowed.
    pub fn can(&self, action: Action) -> bool {
        self.check(action).is_ok()
    }

    /// Whether the board is readable.
    pub fn can_read_board(&self, board: &Board) -> bool {
        self.role.can_access(board.min_read_role)
    }

    /// Check an action on a specific board, including its role thresholds.
    pub fn check_board(
        &self,
        board: &Board,
        action: Action,
    ) -> std::result::Result<(), PermissionError> {
        if !self.can_read_board(board) {
            return Err(self.role_error(board.min_read_role));
        }
        self.check(action)?;
        if action.posts_content() && !self.role.can_access(board.min_write_role) {
            return Err(self.role_error(board.min_write_role));
        }
        Ok(())
    }

    fn role_error(&self, required: Role) -> PermissionError {
        if self.user_id.is_none() {
            PermissionError::NotAuthenticated
        } else {
            PermissionError::InsufficientRole(required.display_name().to_string())
        }
    }
}

/// Resolve a user's access inside a community.
pub async fn resolve_access(
    pool: &DbPool,
    user: Option<&User>,
    community_id: i64,
) -> Result<CommunityAccess> {
    let Some(user) = user else {
        return Ok(CommunityAccess::guest(community_id));
    };
    if !user.is_active {
        return Ok(CommunityAccess::for_user(user, community_id, false, None));
    }

    let is_moderator = CommunityModeratorRepository::new(pool)
        .is_moderator(community_id, user.id)
        .await?;
    let ban = BanRepository::new(pool)
        .find_active(user.id, Some(community_id))
        .await?;

    Ok(CommunityAccess::for_user(
        user,
        community_id,
        is_moderator,
        ban.map(|b| b.reason),
    ))
}

/// Check if a user has the required global role.
///
/// # Examples
///
/// ```
/// use agora::auth::permission::{check_permission, PermissionError};
/// use agora::db::Role;
///
/// assert!(check_permission(None, Role::Guest).is_ok());
/// assert!(matches!(
///     check_permission(None, Role::Member),
///     Err(PermissionError::NotAuthenticated)
/// ));
/// ```
pub fn check_permission(
    user: Option<&User>,
    required: Role,
) -> std::result::Result<(), PermissionError> {
    if required == Role::Guest {
        if let Some(u) = user {
            if !u.is_active {
                return Err(PermissionError::AccountInactive);
            }
        }
        return Ok(());
    }

    let user = user.ok_or(PermissionError::NotAuthenticated)?;
    if !user.is_active {
        return Err(PermissionError::AccountInactive);
    }
    if !user.role.can_access(required) {
        return Err(PermissionError::InsufficientRole(
            required.display_name().to_string(),
        ));
    }
    Ok(())
}

/// Require at least Member role.
pub fn require_member(user: Option<&User>) -> std::result::Result<(), PermissionError> {
    check_permission(user, Role::Member)
}

/// Require at least the global Moderator role.
pub fn require_moderator(user: Option<&User>) -> std::result::Result<(), PermissionError> {
    check_permission(user, Role::Moderator)
}

/// Require the Admin role.
pub fn require_admin(user: Option<&User>) -> std::result::Result<(), PermissionError> {
    check_permission(user, Role::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::{CommunityRepository, NewCommunity};
    use crate::db::{NewUser, UserRepository};
    use crate::moderation::NewBan;
    use crate::Database;

    fn user(id: i64, role: Role, is_active: bool) -> User {
        User {
            id,
            username: format!("user{id}"),
            password: "hash".to_string(),
            display_name: format!("User {id}"),
            email: None,
            role,
            profile: None,
            signature: None,
            post_count: 0,
            is_active,
            created_at: "2024-01-01 00:00:00".to_string(),
            last_login: None,
        }
    }

    fn board(min_read_role: Role, min_write_role: Role) -> Board {
        Board {
            id: 1,
            community_id: 1,
            category_id: 1,
            slug: "general".to_string(),
            name: "General".to_string(),
            description: None,
            sort_order: 0,
            min_read_role,
            min_write_role,
            thread_count: 0,
            post_count: 0,
            last_post_at: None,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_rule_table() {
        assert_eq!(Action::ViewBoard.required_role(), Role::Guest);
        assert_eq!(Action::Reply.required_role(), Role::Member);
        assert_eq!(Action::React.required_role(), Role::Member);
        assert_eq!(Action::ReplyToLocked.required_role(), Role::Moderator);
        assert_eq!(Action::BanUser.required_role(), Role::Moderator);
        assert_eq!(Action::ManageCommunity.required_role(), Role::Admin);
        assert!(!Action::ViewReports.is_write());
        assert!(Action::Report.is_write());
    }

    #[test]
    fn test_guest_access() {
        let access = CommunityAccess::guest(1);
        assert!(access.can(Action::ViewBoard));
        assert_eq!(
            access.check(Action::Reply),
            Err(PermissionError::NotAuthenticated)
        );
    }

    #[test]
    fn test_member_access() {
        let access = CommunityAccess::for_user(&user(1, Role::Member, true), 1, false, None);
        assert!(access.can(Action::CreateThread));
        assert!(access.can(Action::UploadAttachment));
        assert!(matches!(
            access.check(Action::LockThread),
            Err(PermissionError::InsufficientRole(_))
        ));
    }

    #[test]
    fn test_community_moderator_is_raised() {
        let access = CommunityAccess::for_user(&user(1, Role::Member, true), 1, true, None);
        assert_eq!(access.role, Role::Moderator);
        assert!(access.is_moderator());
        assert!(access.can(Action::LockThread));
        assert!(!access.can(Action::ManageCommunity));

        let admin = CommunityAccess::for_user(&user(2, Role::Admin, true), 1, true, None);
        assert_eq!(admin.role, Role::Admin);
    }

    #[test]
    fn test_banned_can_read_but_not_write() {
        let access = CommunityAccess::for_user(
            &user(1, Role::Member, true),
            1,
            false,
            Some("spam".to_string()),
        );
        assert!(access.can(Action::ViewBoard));
        assert_eq!(
            access.check(Action::Reply),
            Err(PermissionError::Banned("spam".to_string()))
        );
        assert!(!access.can(Action::React));
    }

    #[test]
    fn test_inactive_is_guest_only() {
        let access = CommunityAccess::for_user(&user(1, Role::Admin, false), 1, true, None);
        assert_eq!(access.role, Role::Guest);
        assert!(access.can(Action::ViewBoard));
        assert_eq!(
            access.check(Action::Reply),
            Err(PermissionError::AccountInactive)
        );
    }

    #[test]
    fn test_board_thresholds() {
        let member = CommunityAccess::for_user(&user(1, Role::Member, true), 1, false, None);
        let moderator = CommunityAccess::for_user(&user(2, Role::Member, true), 1, true, None);
        let guest = CommunityAccess::guest(1);

        let announcements = board(Role::Guest, Role::Moderator);
        assert!(member.check_board(&announcements, Action::ViewBoard).is_ok());
        assert!(member.check_board(&announcements, Action::CreateThread).is_err());
        assert!(member.check_board(&announcements, Action::React).is_ok());
        assert!(moderator
            .check_board(&announcements, Action::CreateThread)
            .is_ok());

        let staff = board(Role::Moderator, Role::Moderator);
        assert!(!member.can_read_board(&staff));
        assert!(matches!(
            member.check_board(&staff, Action::ViewBoard),
            Err(PermissionError::InsufficientRole(_))
        ));
        assert_eq!(
            guest.check_board(&staff, Action::ViewBoard),
            Err(PermissionError::NotAuthenticated)
        );
    }

    #[test]
    fn test_check_permission_global() {
        let member = user(1, Role::Member, true);
        let moderator = user(2, Role::Moderator, true);
        let admin = user(3, Role::Admin, true);
        let inactive = user(4, Role::Admin, false);

        assert!(require_member(Some(&member)).is_ok());
        assert!(require_moderator(Some(&member)).is_err());
        assert!(require_moderator(Some(&moderator)).is_ok());
        assert!(require_admin(Some(&moderator)).is_err());
        assert!(require_admin(Some(&admin)).is_ok());
        assert_eq!(
            require_admin(Some(&inactive)),
            Err(PermissionError::AccountInactive)
        );
        assert_eq!(require_member(None), Err(PermissionError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_resolve_access() {
        let db = Database::open_in_memory().await.unwrap();
        let pool = db.pool();
        let users = UserRepository::new(pool);
        let admin = users
            .create(&NewUser::new("admin1", "hash", "Admin").with_role(Role::Admin))
            .await
            .unwrap();
        let alice = users
            .create(&NewUser::new("alice", "hash", "Alice"))
            .await
            .unwrap();
        let bob = users.create(&NewUser::new("bob", "hash", "Bob")).await.unwrap();

        let rust = CommunityRepository::new(pool)
            .create(&NewCommunity::new("rust", "Rust"))
            .await
            .unwrap();
        let go = CommunityRepository::new(pool)
            .create(&NewCommunity::new("go", "Go"))
            .await
            .unwrap();

        CommunityModeratorRepository::new(pool)
            .add(rust.id, alice.id, Some(admin.id))
            .await
            .unwrap();
        BanRepository::new(pool)
            .create(&NewBan {
                user_id: bob.id,
                community_id: Some(rust.id),
                reason: "flaming".to_string(),
                banned_by: Some(alice.id),
                expires_at: None,
            })
            .await
            .unwrap();

        let access = resolve_access(pool, Some(&alice), rust.id).await.unwrap();
        assert!(access.is_community_moderator);
        assert_eq!(access.role, Role::Moderator);

        let access = resolve_access(pool, Some(&alice), go.id).await.unwrap();
        assert_eq!(access.role, Role::Member);

        let access = resolve_access(pool, Some(&bob), rust.id).await.unwrap();
        assert_eq!(access.ban_reason.as_deref(), Some("flaming"));
        let access = resolve_access(pool, Some(&bob), go.id).await.unwrap();
        assert!(!access.is_banned());

        let access = resolve_access(pool, None, rust.id).await.unwrap();
        assert_eq!(access, CommunityAccess::guest(rust.id));
    }
}
