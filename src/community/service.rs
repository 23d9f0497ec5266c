//! Community service for Agora.
//!
//! Administration of communities, categories, boards and community
//! moderators, plus the per-user community overview.

use tracing::info;

use super::moderator::CommunityModeratorRepository;
use super::repository::{BoardRepository, CategoryRepository, CommunityRepository};
use super::types::{
    is_valid_slug, Board, BoardUpdate, Category, Community, CommunityModerator, NewBoard,
    NewCategory, NewCommunity, MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH,
};
use crate::auth::{require_admin, resolve_access, CommunityAccess};
use crate::db::{Database, User, UserRepository};
use crate::moderation::{ModLogRepository, NewModLogEntry};
use crate::{AgoraError, Result};

fn validate_slug(slug: &str) -> Result<()> {
    if !is_valid_slug(slug) {
        return Err(AgoraError::Validation(
            "slug must be 2-32 characters of lowercase letters, digits and hyphens".to_string(),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AgoraError::Validation("name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AgoraError::Validation(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_description(description: Option<&str>) -> Result<Option<String>> {
    let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(AgoraError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(Some(description.to_string()))
}

/// A category with the boards the viewer may read.
#[derive(Debug, Clone)]
pub struct CategoryWithBoards {
    /// The category.
    pub category: Category,
    /// Readable boards in display order.
    pub boards: Vec<Board>,
}

/// A community as seen by one viewer.
#[derive(Debug, Clone)]
pub struct CommunityOverview {
    /// The community.
    pub community: Community,
    /// The viewer's effective access.
    pub access: CommunityAccess,
    /// Categories in display order. Categories without readable boards are kept.
    pub categories: Vec<CategoryWithBoards>,
}

/// Service for community administration.
pub struct CommunityService<'a> {
    db: &'a Database,
}

impl<'a> CommunityService<'a> {
    /// Create a new CommunityService with the given database reference.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a community. Admin only.
    pub async fn create_community(
        &self,
        actor: &User,
        slug: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Community> {
        require_admin(Some(actor))?;
        validate_slug(slug)?;
        let name = validate_name(name)?;

        let mut new_community = NewCommunity::new(slug, name);
        new_community.description = validate_description(description)?;

        let community = CommunityRepository::new(self.db.pool())
            .create(&new_community)
            .await?;

        info!(
            community_id = community.id,
            slug = %community.slug,
            actor_id = actor.id,
            "Community created"
        );
        Ok(community)
    }

    /// List every community.
    pub async fn list_communities(&self) -> Result<Vec<Community>> {
        CommunityRepository::new(self.db.pool()).list().await
    }

    /// Get a community by slug.
    pub async fn get_community(&self, slug: &str) -> Result<Community> {
        CommunityRepository::new(self.db.pool())
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| AgoraError::NotFound("community".to_string()))
    }

    /// Get a community by ID.
    pub async fn get_community_by_id(&self, id: i64) -> Result<Community> {
        CommunityRepository::new(self.db.pool())
            .get_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("community".to_string()))
    }

    /// Categories and readable boards of a community for a viewer.
    pub async fn overview(&self, slug: &str, viewer: Option<&User>) -> Result<CommunityOverview> {
        let pool = self.db.pool();
        let community = self.get_community(slug).await?;
        let access = resolve_access(pool, viewer, community.id).await?;

        let categories = CategoryRepository::new(pool)
            .list_by_community(community.id)
            .await?;
        let mut boards = BoardRepository::new(pool)
            .list_by_community(community.id)
            .await?;
        boards.retain(|b| access.can_read_board(b));

        let categories = categories
            .into_iter()
            .map(|category| {
                let boards = boards
                    .iter()
                    .filter(|b| b.category_id == category.id)
                    .cloned()
                    .collect();
                CategoryWithBoards { category, boards }
            })
            .collect();

        Ok(CommunityOverview {
            community,
            access,
            categories,
        })
    }

    /// Create a category. Admin only.
    pub async fn create_category(
        &self,
        actor: &User,
        community_id: i64,
        name: &str,
        sort_order: i32,
    ) -> Result<Category> {
        require_admin(Some(actor))?;
        self.get_community_by_id(community_id).await?;
        let name = validate_name(name)?;

        let category = CategoryRepository::new(self.db.pool())
            .create(&NewCategory::new(community_id, name).with_sort_order(sort_order))
            .await?;

        info!(category_id = category.id, community_id, "Category created");
        Ok(category)
    }

    /// Rename or reorder a category. Admin only.
    pub async fn update_category(
        &self,
        actor: &User,
        category_id: i64,
        name: Option<&str>,
        sort_order: Option<i32>,
    ) -> Result<Category> {
        require_admin(Some(actor))?;
        let name = name.map(validate_name).transpose()?;

        CategoryRepository::new(self.db.pool())
            .update(category_id, name.as_deref(), sort_order)
            .await?
            .ok_or_else(|| AgoraError::NotFound("category".to_string()))
    }

    /// Create a board. Admin only. The category must belong to the same community.
    pub async fn create_board(&self, actor: &User, mut new_board: NewBoard) -> Result<Board> {
        require_admin(Some(actor))?;
        validate_slug(&new_board.slug)?;
        new_board.name = validate_name(&new_board.name)?;
        new_board.description = validate_description(new_board.description.as_deref())?;
        self.check_category(new_board.community_id, new_board.category_id)
            .await?;

        let board = BoardRepository::new(self.db.pool())
            .create(&new_board)
            .await?;

        info!(
            board_id = board.id,
            community_id = board.community_id,
            slug = %board.slug,
            "Board created"
        );
        Ok(board)
    }

    /// Update a board. Admin only.
    pub async fn update_board(
        &self,
        actor: &User,
        board_id: i64,
        mut update: BoardUpdate,
    ) -> Result<Board> {
        require_admin(Some(actor))?;
        let repo = BoardRepository::new(self.db.pool());
        let board = repo
            .get_by_id(board_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("board".to_string()))?;

        if let Some(name) = update.name.take() {
            update.name = Some(validate_name(&name)?);
        }
        if let Some(description) = update.description.take() {
            update.description = Some(validate_description(description.as_deref())?);
        }
        if let Some(category_id) = update.category_id {
            self.check_category(board.community_id, category_id).await?;
        }

        let board = repo
            .update(board_id, &update)
            .await?
            .ok_or_else(|| AgoraError::NotFound("board".to_string()))?;

        info!(board_id, actor_id = actor.id, "Board updated");
        Ok(board)
    }

    async fn check_category(&self, community_id: i64, category_id: i64) -> Result<()> {
        let category = CategoryRepository::new(self.db.pool())
            .get_by_id(category_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("category".to_string()))?;
        if category.community_id != community_id {
            return Err(AgoraError::Validation(
                "category belongs to another community".to_string(),
            ));
        }
        Ok(())
    }

    /// Make a user a moderator of a community. Admin only.
    pub async fn add_moderator(
        &self,
        actor: &User,
        community_id: i64,
        user_id: i64,
    ) -> Result<()> {
        require_admin(Some(actor))?;
        let pool = self.db.pool();
        self.get_community_by_id(community_id).await?;
        let target = UserRepository::new(pool)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("user".to_string()))?;

        let added = CommunityModeratorRepository::new(pool)
            .add(community_id, target.id, Some(actor.id))
            .await?;
        if !added {
            return Err(AgoraError::Conflict(format!(
                "{} is already a moderator",
                target.username
            )));
        }

        ModLogRepository::new(pool)
            .append(&NewModLogEntry::user_action(
                Some(community_id),
                actor.id,
                "add_moderator",
                target.id,
                None,
            ))
            .await?;

        info!(community_id, user_id = target.id, "Community moderator added");
        Ok(())
    }

    /// Remove a community moderator. Admin only.
    pub async fn remove_moderator(
        &self,
        actor: &User,
        community_id: i64,
        user_id: i64,
    ) -> Result<()> {
        require_admin(Some(actor))?;
        let pool = self.db.pool();

        let removed = CommunityModeratorRepository::new(pool)
            .remove(community_id, user_id)
            .await?;
        if !removed {
            return Err(AgoraError::NotFound("moderator".to_string()));
        }

        ModLogRepository::new(pool)
            .append(&NewModLogEntry::user_action(
                Some(community_id),
                actor.id,
                "remove_moderator",
                user_id,
                None,
            ))
            .await?;

        info!(community_id, user_id, "Community moderator removed");
        Ok(())
    }

    /// List the moderators of a community.
    pub async fn list_moderators(&self, community_id: i64) -> Result<Vec<CommunityModerator>> {
        CommunityModeratorRepository::new(self.db.pool())
            .list(community_id)
            .await
    }
}
