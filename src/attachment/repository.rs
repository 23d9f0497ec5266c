//! Attachment metadata.

use crate::db::DbPool;
use crate::{AgoraError, Result};

/// Metadata of a file attached to a post.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Attachment {
    pub id: i64,
    pub post_id: i64,
    pub uploader_id: i64,
    /// Sanitized name supplied by the uploader.
    pub original_name: String,
    /// Name inside [`FileStorage`](super::FileStorage).
    pub stored_name: String,
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    pub download_count: i64,
    pub created_at: String,
}

/// Data for a new attachment.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub post_id: i64,
    pub uploader_id: i64,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size: i64,
}

const ATTACHMENT_COLUMNS: &str = "id, post_id, uploader_id, original_name, stored_name, mime_type,
        size, download_count, created_at";

/// Repository for attachment metadata.
pub struct AttachmentRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AttachmentRepository<'a> {
    /// Create a new AttachmentRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert attachment metadata.
    pub async fn create(&self, attachment: &NewAttachment) -> Result<Attachment> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO attachments (post_id, uploader_id, original_name, stored_name, mime_type, size)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(attachment.post_id)
        .bind(attachment.uploader_id)
        .bind(&attachment.original_name)
        .bind(&attachment.stored_name)
        .bind(&attachment.mime_type)
        .bind(attachment.size)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("attachment".to_string()))
    }

    /// Get an attachment by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Attachment>> {
        let sql = format!("SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = ?");
        let attachment = sqlx::query_as::<_, Attachment>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(attachment)
    }

    /// Attachments of a post, oldest first.
    pub async fn list_by_post(&self, post_id: i64) -> Result<Vec<Attachment>> {
        let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE post_id = ? ORDER BY id"
        );
        let attachments = sqlx::query_as::<_, Attachment>(&sql)
            .bind(post_id)
            .fetch_all(self.pool)
            .await?;
        Ok(attachments)
    }

    /// Number of attachments on a post.
    pub async fn count_by_post(&self, post_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attachments WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Stored file names of every attachment in a thread.
    pub async fn stored_names_for_thread(&self, thread_id: i64) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT a.stored_name FROM attachments a
             JOIN posts p ON p.id = a.post_id
             WHERE p.thread_id = ?",
        )
        .bind(thread_id)
        .fetch_all(self.pool)
        .await?;
        Ok(names)
    }

    /// Bump the download counter.
    pub async fn increment_downloads(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE attachments SET download_count = download_count + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete attachment metadata. Returns false if it did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
