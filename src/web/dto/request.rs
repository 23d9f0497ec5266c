//! Request DTOs.
//!
//! Length rules here are coarse upper bounds that protect the services from
//! oversized input; the services apply the exact domain rules.

use serde::Deserialize;
use validator::Validate;

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

/// Registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
    #[validate(
        length(min = 1, max = 64),
        custom(function = "super::validation::no_control_chars")
    )]
    pub display_name: String,
    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: Option<String>,
}

/// Password change request.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 256))]
    pub current_password: String,
    #[validate(length(min = 1, max = 256))]
    pub new_password: String,
}

/// Profile update. Absent fields are left alone; blank strings clear
/// optional fields.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "super::validation::no_control_chars"))]
    pub display_name: Option<String>,
    #[validate(length(max = 254))]
    pub email: Option<String>,
    #[validate(length(max = 4000))]
    pub profile: Option<String>,
    #[validate(length(max = 1000))]
    pub signature: Option<String>,
}

/// Community creation request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommunityRequest {
    #[validate(custom(function = "super::validation::valid_slug"))]
    pub slug: String,
    #[validate(
        length(min = 1, max = 64),
        custom(function = "super::validation::not_empty_trimmed")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Category creation request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(
        length(min = 1, max = 64),
        custom(function = "super::validation::not_empty_trimmed")
    )]
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
}

/// Category update request. Absent fields are left alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    pub sort_order: Option<i32>,
}

/// Board creation request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    pub category_id: i64,
    #[validate(custom(function = "super::validation::valid_slug"))]
    pub slug: String,
    #[validate(
        length(min = 1, max = 64),
        custom(function = "super::validation::not_empty_trimmed")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    #[validate(custom(function = "super::validation::valid_role"))]
    pub min_read_role: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "super::validation::valid_role"))]
    pub min_write_role: Option<String>,
}

/// Board update request. Absent fields are left alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub sort_order: Option<i32>,
    #[validate(custom(function = "super::validation::valid_role"))]
    pub min_read_role: Option<String>,
    #[validate(custom(function = "super::validation::valid_role"))]
    pub min_write_role: Option<String>,
}

/// Moderator assignment request.
#[derive(Debug, Deserialize)]
pub struct AddModeratorRequest {
    pub user_id: i64,
}

/// New thread with its opening post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateThreadRequest {
    #[validate(
        length(min = 1, max = 1000),
        custom(function = "super::validation::single_line")
    )]
    pub title: String,
    #[validate(
        length(min = 1, max = 200000),
        custom(function = "super::validation::not_empty_trimmed")
    )]
    pub body: String,
}

/// Reply or edit body.
#[derive(Debug, Deserialize, Validate)]
pub struct PostBodyRequest {
    #[validate(
        length(min = 1, max = 200000),
        custom(function = "super::validation::not_empty_trimmed")
    )]
    pub body: String,
}

/// Thread move request.
#[derive(Debug, Deserialize)]
pub struct MoveThreadRequest {
    pub board_id: i64,
}

/// Reaction toggle request.
#[derive(Debug, Deserialize, Validate)]
pub struct ReactionRequest {
    #[validate(length(min = 1, max = 32))]
    pub kind: String,
}

/// Report submission request.
#[derive(Debug, Deserialize, Validate)]
pub struct ReportRequest {
    #[validate(
        length(min = 1, max = 2000),
        custom(function = "super::validation::not_empty_trimmed")
    )]
    pub reason: String,
}

/// Ban request. The community comes from the path for community bans, and
/// from the body for site-wide bans issued by admins.
#[derive(Debug, Deserialize, Validate)]
pub struct BanUserRequest {
    pub user_id: i64,
    #[validate(
        length(min = 1, max = 2000),
        custom(function = "super::validation::not_empty_trimmed")
    )]
    pub reason: String,
    /// Ban length in seconds; absent means permanent.
    #[validate(range(min = 60, max = 315_360_000))]
    pub duration_secs: Option<i64>,
    #[serde(default)]
    pub community_id: Option<i64>,
}

/// Role change request.
#[derive(Debug, Deserialize, Validate)]
pub struct SetRoleRequest {
    #[validate(custom(function = "super::validation::valid_role"))]
    pub role: String,
}

/// Activation change request.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// BBCode preview request.
#[derive(Debug, Deserialize, Validate)]
pub struct PreviewRequest {
    /// Further capped by `forum.max_body_length` in the handler.
    #[validate(length(max = 100000))]
    pub body: String,
}

/// Pagination query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PaginationQuery {
    /// Page number, defaulting to 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, defaulting to `default`.
    pub fn per_page(&self, default: u32) -> u32 {
        self.per_page.unwrap_or(default).max(1)
    }
}

/// Report list query.
#[derive(Debug, Default, Deserialize)]
pub struct ReportListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Notification list query.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Search query string.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    /// Community slug.
    pub community: Option<String>,
    /// Board ID.
    pub board: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_thread_rules() {
        let ok = CreateThreadRequest {
            title: "Hello".to_string(),
            body: "World".to_string(),
        };
        assert!(ok.validate().is_ok());

        let blank = CreateThreadRequest {
            title: "   ".to_string(),
            body: "World".to_string(),
        };
        let errors = blank.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn test_board_roles() {
        let req: CreateBoardRequest = serde_json::from_str(
            r#"{"category_id": 1, "slug": "help", "name": "Help", "min_write_role": "king"}"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("min_write_role"));
        assert!(!errors.field_errors().contains_key("min_read_role"));
    }

    #[test]
    fn test_ban_duration_floor() {
        let req: BanUserRequest =
            serde_json::from_str(r#"{"user_id": 2, "reason": "spam", "duration_secs": 5}"#)
                .unwrap();
        assert!(req.validate().is_err());

        let req: BanUserRequest =
            serde_json::from_str(r#"{"user_id": 2, "reason": "spam"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.community_id.is_none());
    }

    #[test]
    fn test_pagination_defaults() {
        let q = PaginationQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(25), 25);

        let q = PaginationQuery {
            page: Some(0),
            per_page: Some(0),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(25), 1);
    }
}
