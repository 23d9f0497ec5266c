//! Community, category and board models for Agora.

use crate::db::Role;

/// Minimum slug length.
pub const MIN_SLUG_LENGTH: usize = 2;

/// Maximum slug length.
pub const MAX_SLUG_LENGTH: usize = 32;

/// Maximum community, category or board name length.
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum description length.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Check that a slug is 2-32 characters of `[a-z0-9-]`.
///
/// # Examples
///
/// ```
/// use agora::community::is_valid_slug;
///
/// assert!(is_valid_slug("rust-lang"));
/// assert!(!is_valid_slug("Rust"));
/// assert!(!is_valid_slug("a"));
/// ```
pub fn is_valid_slug(slug: &str) -> bool {
    (MIN_SLUG_LENGTH..=MAX_SLUG_LENGTH).contains(&slug.len())
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// A self-contained forum hosted on the site.
#[derive(Debug, Clone)]
pub struct Community {
    /// Unique community ID.
    pub id: i64,
    /// URL slug (unique).
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// Data for creating a new community.
#[derive(Debug, Clone)]
pub struct NewCommunity {
    /// URL slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
}

impl NewCommunity {
    /// Create a new community with minimal required fields.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named group of boards inside a community.
#[derive(Debug, Clone)]
pub struct Category {
    /// Unique category ID.
    pub id: i64,
    /// Owning community.
    pub community_id: i64,
    /// Display name.
    pub name: String,
    /// Sort order for display.
    pub sort_order: i32,
}

/// Data for creating a new category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    /// Owning community.
    pub community_id: i64,
    /// Display name.
    pub name: String,
    /// Sort order (defaults to 0).
    pub sort_order: i32,
}

impl NewCategory {
    /// Create a new category.
    pub fn new(community_id: i64, name: impl Into<String>) -> Self {
        Self {
            community_id,
            name: name.into(),
            sort_order: 0,
        }
    }

    /// Set the sort order.
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// A board holding threads.
#[derive(Debug, Clone)]
pub struct Board {
    /// Unique board ID.
    pub id: i64,
    /// Owning community.
    pub community_id: i64,
    /// Category the board is listed under.
    pub category_id: i64,
    /// URL slug (unique within the community).
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Sort order within the category.
    pub sort_order: i32,
    /// Minimum role required to read.
    pub min_read_role: Role,
    /// Minimum role required to post.
    pub min_write_role: Role,
    /// Number of threads.
    pub thread_count: i64,
    /// Number of posts across all threads.
    pub post_count: i64,
    /// Time of the newest post.
    pub last_post_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// Data for creating a new board.
#[derive(Debug, Clone)]
pub struct NewBoard {
    /// Owning community.
    pub community_id: i64,
    /// Category.
    pub category_id: i64,
    /// URL slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Sort order (defaults to 0).
    pub sort_order: i32,
    /// Minimum read role (defaults to Guest).
    pub min_read_role: Role,
    /// Minimum write role (defaults to Member).
    pub min_write_role: Role,
}

impl NewBoard {
    /// Create a new board with minimal required fields.
    pub fn new(
        community_id: i64,
        category_id: i64,
        slug: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            community_id,
            category_id,
            slug: slug.into(),
            name: name.into(),
            description: None,
            sort_order: 0,
            min_read_role: Role::Guest,
            min_write_role: Role::Member,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the sort order.
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Set the minimum read role.
    pub fn with_min_read_role(mut self, role: Role) -> Self {
        self.min_read_role = role;
        self
    }

    /// Set the minimum write role.
    pub fn with_min_write_role(mut self, role: Role) -> Self {
        self.min_write_role = role;
        self
    }
}

/// Data for updating an existing board.
#[derive(Debug, Clone, Default)]
pub struct BoardUpdate {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New category.
    pub category_id: Option<i64>,
    /// New sort order.
    pub sort_order: Option<i32>,
    /// New minimum read role.
    pub min_read_role: Option<Role>,
    /// New minimum write role.
    pub min_write_role: Option<Role>,
}

impl BoardUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set new name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set or clear the description.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Move the board to another category.
    pub fn category_id(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Set new sort order.
    pub fn sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    /// Set new minimum read role.
    pub fn min_read_role(mut self, role: Role) -> Self {
        self.min_read_role = Some(role);
        self
    }

    /// Set new minimum write role.
    pub fn min_write_role(mut self, role: Role) -> Self {
        self.min_write_role = Some(role);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.sort_order.is_none()
            && self.min_read_role.is_none()
            && self.min_write_role.is_none()
    }
}

/// A moderator assignment in a community, with the user's names.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommunityModerator {
    /// Community ID.
    pub community_id: i64,
    /// Moderator's user ID.
    pub user_id: i64,
    /// Moderator's username.
    pub username: String,
    /// Moderator's display name.
    pub display_name: String,
    /// Admin who made the assignment.
    pub added_by: Option<i64>,
    /// Assignment timestamp.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("rust"));
        assert!(is_valid_slug("rust-lang-2024"));
        assert!(is_valid_slug("ab"));
        assert!(is_valid_slug(&"a".repeat(32)));

        assert!(!is_valid_slug("a"));
        assert!(!is_valid_slug(&"a".repeat(33)));
        assert!(!is_valid_slug("Rust"));
        assert!(!is_valid_slug("rust_lang"));
        assert!(!is_valid_slug("rust lang"));
        assert!(!is_valid_slug("rüst"));
    }

    #[test]
    fn test_new_board_defaults() {
        let board = NewBoard::new(1, 2, "general", "General");
        assert_eq!(board.community_id, 1);
        assert_eq!(board.category_id, 2);
        assert_eq!(board.min_read_role, Role::Guest);
        assert_eq!(board.min_write_role, Role::Member);
        assert_eq!(board.sort_order, 0);
    }

    #[test]
    fn test_new_board_builder() {
        let board = NewBoard::new(1, 1, "staff", "Staff")
            .with_description("Staff only")
            .with_min_read_role(Role::Moderator)
            .with_min_write_role(Role::Moderator)
            .with_sort_order(9);

        assert_eq!(board.description.as_deref(), Some("Staff only"));
        assert_eq!(board.min_read_role, Role::Moderator);
        assert_eq!(board.sort_order, 9);
    }

    #[test]
    fn test_board_update_builder() {
        assert!(BoardUpdate::new().is_empty());

        let update = BoardUpdate::new()
            .name("Renamed")
            .description(None)
            .min_write_role(Role::Admin);
        assert!(!update.is_empty());
        assert_eq!(update.description, Some(None));
        assert_eq!(update.min_write_role, Some(Role::Admin));
    }

    #[test]
    fn test_new_community_and_category() {
        let community = NewCommunity::new("rust", "Rust").with_description("All things Rust");
        assert_eq!(community.description.as_deref(), Some("All things Rust"));

        let category = NewCategory::new(1, "Help").with_sort_order(3);
        assert_eq!(category.sort_order, 3);
    }
}
