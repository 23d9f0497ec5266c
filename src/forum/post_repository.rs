//! Post repository for Agora.

use super::post::{NewPost, Post};
use crate::db::DbPool;
use crate::{AgoraError, Result};

const POST_SELECT: &str = "SELECT p.id, p.thread_id, p.author_id, u.username AS author_username,
        u.display_name AS author_display_name, p.body_raw, p.body_html, p.is_deleted,
        p.created_at, p.edited_at, p.edited_by
     FROM posts p
     JOIN users u ON u.id = p.author_id";

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new PostRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Append a reply to a thread.
    ///
    /// Thread and board counters and `last_post_*` move in the same transaction.
    pub async fn create_reply(&self, new_post: &NewPost) -> Result<Post> {
        let mut tx = self.pool.begin().await?;

        let (post_id, created_at): (i64, String) = sqlx::query_as(
            "INSERT INTO posts (thread_id, author_id, body_raw, body_html)
             VALUES (?, ?, ?, ?) RETURNING id, created_at",
        )
        .bind(new_post.thread_id)
        .bind(new_post.author_id)
        .bind(&new_post.body_raw)
        .bind(&new_post.body_html)
        .fetch_one(&mut *tx)
        .await?;

        let board_id: i64 = sqlx::query_scalar(
            "UPDATE threads
             SET post_count = post_count + 1, last_post_id = ?, last_post_at = ?
             WHERE id = ? RETURNING board_id",
        )
        .bind(post_id)
        .bind(&created_at)
        .bind(new_post.thread_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE boards SET post_count = post_count + 1, last_post_at = ? WHERE id = ?",
        )
        .bind(&created_at)
        .bind(board_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(post_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("post".to_string()))
    }

    /// Get a post by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("{POST_SELECT} WHERE p.id = ?");
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(post)
    }

    /// List posts of a thread in `(created_at, id)` order.
    pub async fn list_by_thread(&self, thread_id: i64, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let sql = format!(
            "{POST_SELECT} WHERE p.thread_id = ?
             ORDER BY p.created_at ASC, p.id ASC
             LIMIT ? OFFSET ?"
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(thread_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(posts)
    }

    /// Count posts in a thread, deleted ones included.
    pub async fn count_by_thread(&self, thread_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Whether the post opens its thread.
    pub async fn is_first_in_thread(&self, post: &Post) -> Result<bool> {
        let first: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM posts WHERE thread_id = ? ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .bind(post.thread_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(first == Some(post.id))
    }

    /// Replace a post's body and record the editor.
    pub async fn update_body(
        &self,
        id: i64,
        body_raw: &str,
        body_html: &str,
        edited_by: i64,
    ) -> Result<Option<Post>> {
        let result = sqlx::query(
            "UPDATE posts
             SET body_raw = ?, body_html = ?, edited_at = datetime('now'), edited_by = ?
             WHERE id = ?",
        )
        .bind(body_raw)
        .bind(body_html)
        .bind(edited_by)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Mark a post as deleted. Returns false if it was missing or already deleted.
    pub async fn soft_delete(&self, id: i64, deleted_by: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET is_deleted = 1, edited_at = datetime('now'), edited_by = ?
             WHERE id = ? AND is_deleted = 0",
        )
        .bind(deleted_by)
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::{
        BoardRepository, CategoryRepository, CommunityRepository, NewBoard, NewCategory,
        NewCommunity,
    };
    use crate::db::{NewUser, UserRepository};
    use crate::forum::{NewThread, ThreadRepository};
    use crate::Database;

    async fn setup() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let pool = db.pool();
        let user = UserRepository::new(pool)
            .create(&NewUser::new("alice", "hash", "Alice"))
            .await
            .unwrap();
        let community = CommunityRepository::new(pool)
            .create(&NewCommunity::new("rust", "Rust"))
            .await
            .unwrap();
        let category = CategoryRepository::new(pool)
            .create(&NewCategory::new(community.id, "General"))
            .await
            .unwrap();
        let board = BoardRepository::new(pool)
            .create(&NewBoard::new(community.id, category.id, "help", "Help"))
            .await
            .unwrap();
        let (thread, _) = ThreadRepository::new(pool)
            .create_with_first_post(&NewThread::new(board.id, user.id, "T", "first", "first"))
            .await
            .unwrap();
        (db, user.id, board.id, thread.id)
    }

    #[tokio::test]
    async fn test_reply_updates_counters() {
        let (db, user_id, board_id, thread_id) = setup().await;
        let repo = PostRepository::new(db.pool());

        let reply = repo
            .create_reply(&NewPost::new(thread_id, user_id, "second", "second"))
            .await
            .unwrap();
        assert_eq!(reply.author_username, "alice");
        assert!(!reply.is_deleted);

        let thread = ThreadRepository::new(db.pool())
            .get_by_id(thread_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(thread.post_count, 2);
        assert_eq!(thread.last_post_id, Some(reply.id));

        let board = BoardRepository::new(db.pool())
            .get_by_id(board_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(board.post_count, 2);
        assert_eq!(repo.count_by_thread(thread_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_is_ordered() {
        let (db, user_id, _, thread_id) = setup().await;
        let repo = PostRepository::new(db.pool());
        for body in ["b", "c", "d"] {
            repo.create_reply(&NewPost::new(thread_id, user_id, body, body))
                .await
                .unwrap();
        }

        let posts = repo.list_by_thread(thread_id, 0, 10).await.unwrap();
        let bodies: Vec<_> = posts.iter().map(|p| p.body_raw.as_str()).collect();
        assert_eq!(bodies, ["first", "b", "c", "d"]);

        let page = repo.list_by_thread(thread_id, 2, 2).await.unwrap();
        assert_eq!(page[0].body_raw, "c");
        assert!(repo.is_first_in_thread(&posts[0]).await.unwrap());
        assert!(!repo.is_first_in_thread(&posts[1]).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_and_soft_delete() {
        let (db, user_id, _, thread_id) = setup().await;
        let repo = PostRepository::new(db.pool());
        let post = repo
            .create_reply(&NewPost::new(thread_id, user_id, "old", "old"))
            .await
            .unwrap();

        let edited = repo
            .update_body(post.id, "new", "<p>new</p>", user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.body_raw, "new");
        assert!(edited.edited_at.is_some());
        assert_eq!(edited.edited_by, Some(user_id));

        assert!(repo.soft_delete(post.id, user_id).await.unwrap());
        assert!(!repo.soft_delete(post.id, user_id).await.unwrap());
        assert!(repo.get_by_id(post.id).await.unwrap().unwrap().is_deleted);
        assert_eq!(repo.count_by_thread(thread_id).await.unwrap(), 2);
        assert!(repo.update_body(9999, "x", "x", user_id).await.unwrap().is_none());
    }
}
