//! Thread repository for Agora.
//!
//! Thread mutations that touch board counters run in a single transaction so
//! `boards.thread_count` and `boards.post_count` always match their threads.

use sqlx::{Sqlite, Transaction};

use super::post::Post;
use super::thread::{NewThread, Thread};
use crate::db::DbPool;
use crate::{AgoraError, Result};

const THREAD_SELECT: &str = "SELECT t.id, t.board_id, t.author_id, u.username AS author_username,
        u.display_name AS author_display_name, t.title, t.is_locked, t.is_sticky,
        t.post_count, t.view_count, t.last_post_id, t.last_post_at, t.created_at
     FROM threads t
     JOIN users u ON u.id = t.author_id";

/// Recompute a board's `last_post_at` from its remaining threads.
async fn refresh_board_last_post(tx: &mut Transaction<'_, Sqlite>, board_id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE boards
         SET last_post_at = (SELECT MAX(last_post_at) FROM threads WHERE board_id = ?)
         WHERE id = ?",
    )
    .bind(board_id)
    .bind(board_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Repository for thread operations.
pub struct ThreadRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ThreadRepository<'a> {
    /// Create a new ThreadRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a thread and its first post atomically.
    ///
    /// Board counters and `last_post_at` are updated in the same transaction.
    pub async fn create_with_first_post(&self, new_thread: &NewThread) -> Result<(Thread, Post)> {
        let mut tx = self.pool.begin().await?;

        let thread_id: i64 = sqlx::query_scalar(
            "INSERT INTO threads (board_id, author_id, title) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(new_thread.board_id)
        .bind(new_thread.author_id)
        .bind(&new_thread.title)
        .fetch_one(&mut *tx)
        .await?;

        let (post_id, created_at): (i64, String) = sqlx::query_as(
            "INSERT INTO posts (thread_id, author_id, body_raw, body_html)
             VALUES (?, ?, ?, ?) RETURNING id, created_at",
        )
        .bind(thread_id)
        .bind(new_thread.author_id)
        .bind(&new_thread.body_raw)
        .bind(&new_thread.body_html)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE threads SET post_count = 1, last_post_id = ?, last_post_at = ? WHERE id = ?",
        )
        .bind(post_id)
        .bind(&created_at)
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE boards
             SET thread_count = thread_count + 1, post_count = post_count + 1, last_post_at = ?
             WHERE id = ?",
        )
        .bind(&created_at)
        .bind(new_thread.board_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let thread = self
            .get_by_id(thread_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("thread".to_string()))?;
        let post = super::post_repository::PostRepository::new(self.pool)
            .get_by_id(post_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("post".to_string()))?;
        Ok((thread, post))
    }

    /// Get a thread by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Thread>> {
        let sql = format!("{THREAD_SELECT} WHERE t.id = ?");
        let thread = sqlx::query_as::<_, Thread>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(thread)
    }

    /// List threads in a board: sticky first, then most recently active.
    pub async fn list_by_board(&self, board_id: i64, offset: i64, limit: i64) -> Result<Vec<Thread>> {
        let sql = format!(
            "{THREAD_SELECT} WHERE t.board_id = ?
             ORDER BY t.is_sticky DESC, t.last_post_at DESC, t.id DESC
             LIMIT ? OFFSET ?"
        );
        let threads = sqlx::query_as::<_, Thread>(&sql)
            .bind(board_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(threads)
    }

    /// Count threads in a board.
    pub async fn count_by_board(&self, board_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM threads WHERE board_id = ?")
            .bind(board_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Increment the view counter.
    pub async fn increment_view_count(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE threads SET view_count = view_count + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Lock or unlock a thread. Returns false if the thread doesn't exist.
    pub async fn set_locked(&self, id: i64, locked: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE threads SET is_locked = ? WHERE id = ?")
            .bind(locked)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Pin or unpin a thread. Returns false if the thread doesn't exist.
    pub async fn set_sticky(&self, id: i64, sticky: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE threads SET is_sticky = ? WHERE id = ?")
            .bind(sticky)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a thread to another board, shifting counters between the boards.
    pub async fn move_to_board(&self, id: i64, to_board_id: i64) -> Result<Option<Thread>> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(i64, i64)> =
            sqlx::query_as("SELECT board_id, post_count FROM threads WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((from_board_id, post_count)) = current else {
            return Ok(None);
        };

        if from_board_id != to_board_id {
            sqlx::query("UPDATE threads SET board_id = ? WHERE id = ?")
                .bind(to_board_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "UPDATE boards
                 SET thread_count = thread_count - 1, post_count = post_count - ?
                 WHERE id = ?",
            )
            .bind(post_count)
            .bind(from_board_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE boards
                 SET thread_count = thread_count + 1, post_count = post_count + ?
                 WHERE id = ?",
            )
            .bind(post_count)
            .bind(to_board_id)
            .execute(&mut *tx)
            .await?;

            refresh_board_last_post(&mut tx, from_board_id).await?;
            refresh_board_last_post(&mut tx, to_board_id).await?;
        }

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Hard-delete a thread with its posts.
    ///
    /// Returns false if the thread doesn't exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(i64, i64)> =
            sqlx::query_as("SELECT board_id, post_count FROM threads WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((board_id, post_count)) = current else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE boards
             SET thread_count = thread_count - 1, post_count = post_count - ?
             WHERE id = ?",
        )
        .bind(post_count)
        .bind(board_id)
        .execute(&mut *tx)
        .await?;

        refresh_board_last_post(&mut tx, board_id).await?;

        tx.commit().await?;
        Ok(true)
    }
}
