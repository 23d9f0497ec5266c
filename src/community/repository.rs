//! Community, category and board repositories for Agora.

use sqlx::{QueryBuilder, Sqlite};

use super::types::{Board, BoardUpdate, Category, Community, NewBoard, NewCategory, NewCommunity};
use crate::db::{DbPool, Role};
use crate::{AgoraError, Result};

fn map_unique(e: sqlx::Error, what: &str) -> AgoraError {
    if e.to_string().contains("UNIQUE") {
        AgoraError::Conflict(format!("{what} already exists"))
    } else {
        AgoraError::Database(e.to_string())
    }
}

/// Repository for communities.
pub struct CommunityRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> CommunityRepository<'a> {
    /// Create a new CommunityRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new community.
    pub async fn create(&self, new_community: &NewCommunity) -> Result<Community> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO communities (slug, name, description) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&new_community.slug)
        .bind(&new_community.name)
        .bind(&new_community.description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique(e, "community slug"))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("community".to_string()))
    }

    /// Get a community by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Community>> {
        let row: Option<CommunityRow> = sqlx::query_as(
            "SELECT id, slug, name, description, created_at FROM communities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(CommunityRow::into_community))
    }

    /// Get a community by slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Community>> {
        let row: Option<CommunityRow> = sqlx::query_as(
            "SELECT id, slug, name, description, created_at FROM communities WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(CommunityRow::into_community))
    }

    /// List all communities ordered by name.
    pub async fn list(&self) -> Result<Vec<Community>> {
        let rows: Vec<CommunityRow> = sqlx::query_as(
            "SELECT id, slug, name, description, created_at FROM communities ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(CommunityRow::into_community).collect())
    }

    /// Update name and description. Returns None if not found.
    pub async fn update(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<Option<Community>> {
        if name.is_none() && description.is_none() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE communities SET ");
        let mut separated = query.separated(", ");
        if let Some(name) = name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.to_string());
        }
        if let Some(description) = description {
            separated.push("description = ");
            separated.push_bind_unseparated(description.map(str::to_string));
        }
        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }
}

/// Repository for categories.
pub struct CategoryRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new CategoryRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new category.
    pub async fn create(&self, new_category: &NewCategory) -> Result<Category> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO categories (community_id, name, sort_order) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(new_category.community_id)
        .bind(&new_category.name)
        .bind(new_category.sort_order)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("category".to_string()))
    }

    /// Get a category by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, community_id, name, sort_order FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(CategoryRow::into_category))
    }

    /// List the categories of a community in display order.
    pub async fn list_by_community(&self, community_id: i64) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, community_id, name, sort_order FROM categories
             WHERE community_id = ? ORDER BY sort_order, id",
        )
        .bind(community_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(CategoryRow::into_category).collect())
    }

    /// Rename or reorder a category. Returns None if not found.
    pub async fn update(
        &self,
        id: i64,
        name: Option<&str>,
        sort_order: Option<i32>,
    ) -> Result<Option<Category>> {
        sqlx::query(
            "UPDATE categories SET name = COALESCE(?, name), sort_order = COALESCE(?, sort_order)
             WHERE id = ?",
        )
        .bind(name)
        .bind(sort_order)
        .bind(id)
        .execute(self.pool)
        .await?;
        self.get_by_id(id).await
    }
}

const BOARD_COLUMNS: &str = "id, community_id, category_id, slug, name, description, sort_order,
                             min_read_role, min_write_role, thread_count, post_count,
                             last_post_at, created_at";

/// Repository for boards.
pub struct BoardRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> BoardRepository<'a> {
    /// Create a new BoardRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new board.
    pub async fn create(&self, new_board: &NewBoard) -> Result<Board> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO boards (community_id, category_id, slug, name, description, sort_order,
                                 min_read_role, min_write_role)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(new_board.community_id)
        .bind(new_board.category_id)
        .bind(&new_board.slug)
        .bind(&new_board.name)
        .bind(&new_board.description)
        .bind(new_board.sort_order)
        .bind(new_board.min_read_role.as_str())
        .bind(new_board.min_write_role.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique(e, "board slug"))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("board".to_string()))
    }

    /// Get a board by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Board>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = ?");
        let row: Option<BoardRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(BoardRow::into_board))
    }

    /// Get a board by its slug within a community.
    pub async fn get_by_slug(&self, community_id: i64, slug: &str) -> Result<Option<Board>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE community_id = ? AND slug = ?");
        let row: Option<BoardRow> = sqlx::query_as(&sql)
            .bind(community_id)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(BoardRow::into_board))
    }

    /// List the boards of a community in display order.
    pub async fn list_by_community(&self, community_id: i64) -> Result<Vec<Board>> {
        let sql = format!(
            "SELECT {BOARD_COLUMNS} FROM boards WHERE community_id = ? ORDER BY sort_order, id"
        );
        let rows: Vec<BoardRow> = sqlx::query_as(&sql)
            .bind(community_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(BoardRow::into_board).collect())
    }

    /// List every board on the site.
    pub async fn list_all(&self) -> Result<Vec<Board>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards ORDER BY community_id, sort_order, id");
        let rows: Vec<BoardRow> = sqlx::query_as(&sql).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(BoardRow::into_board).collect())
    }

    /// Update a board by ID.
    ///
    /// Only fields that are set in the update will be modified.
    /// Returns the updated board, or None if not found.
    pub async fn update(&self, id: i64, update: &BoardUpdate) -> Result<Option<Board>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE boards SET ");
        let mut separated = query.separated(", ");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }
        if let Some(ref description) = update.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description.clone());
        }
        if let Some(category_id) = update.category_id {
            separated.push("category_id = ");
            separated.push_bind_unseparated(category_id);
        }
        if let Some(sort_order) = update.sort_order {
            separated.push("sort_order = ");
            separated.push_bind_unseparated(sort_order);
        }
        if let Some(role) = update.min_read_role {
            separated.push("min_read_role = ");
            separated.push_bind_unseparated(role.as_str());
        }
        if let Some(role) = update.min_write_role {
            separated.push("min_write_role = ");
            separated.push_bind_unseparated(role.as_str());
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }
}

#[derive(sqlx::FromRow)]
struct CommunityRow {
    id: i64,
    slug: String,
    name: String,
    description: Option<String>,
    created_at: String,
}

impl CommunityRow {
    fn into_community(self) -> Community {
        Community {
            id: self.id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    community_id: i64,
    name: String,
    sort_order: i32,
}

impl CategoryRow {
    fn into_category(self) -> Category {
        Category {
            id: self.id,
            community_id: self.community_id,
            name: self.name,
            sort_order: self.sort_order,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BoardRow {
    id: i64,
    community_id: i64,
    category_id: i64,
    slug: String,
    name: String,
    description: Option<String>,
    sort_order: i32,
    min_read_role: String,
    min_write_role: String,
    thread_count: i64,
    post_count: i64,
    last_post_at: Option<String>,
    created_at: String,
}

impl BoardRow {
    fn into_board(self) -> Board {
        Board {
            id: self.id,
            community_id: self.community_id,
            category_id: self.category_id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            sort_order: self.sort_order,
            min_read_role: self.min_read_role.parse().unwrap_or(Role::Guest),
            min_write_role: self.min_write_role.parse().unwrap_or(Role::Member),
            thread_count: self.thread_count,
            post_count: self.post_count,
            last_post_at: self.last_post_at,
            created_at: self.created_at,
        }
    }
}
