//! Authentication and authorization for Agora.
//!
//! Password hashing, registration, database-backed login sessions, profile
//! updates and the role/permission rules used by every other module.

mod password;
pub mod permission;
mod profile;
mod registration;
mod session;
pub mod validation;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use permission::{
    check_permission, require_admin, require_member, require_moderator, resolve_access, Action,
    CommunityAccess, PermissionError,
};
pub use profile::{
    get_profile_by_username, update_profile, ProfileError, ProfileUpdateRequest, UserProfile,
};
pub use registration::{register, register_with_role, RegistrationError, RegistrationRequest};
pub use session::{
    generate_token, hash_token, AuthenticatedSession, ClientInfo, LimitResult, LoginLimiter,
    LoginOutcome, SessionError, SessionService, ATTEMPT_WINDOW_SECS, LOCKOUT_DURATION_SECS,
    MAX_LOGIN_ATTEMPTS,
};
pub use validation::ValidationError;
