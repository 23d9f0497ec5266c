//! Attachment service for Agora.

use tracing::{info, warn};

use super::repository::{Attachment, AttachmentRepository, NewAttachment};
use super::storage::FileStorage;
use crate::auth::Action;
use crate::config::AttachmentsConfig;
use crate::db::{Database, User};
use crate::forum::post_context;
use crate::{AgoraError, Result};

/// Longest original filename kept, in characters.
pub const MAX_FILENAME_LENGTH: usize = 100;

/// A downloaded attachment.
#[derive(Debug, Clone)]
pub struct Download {
    pub attachment: Attachment,
    pub content: Vec<u8>,
}

/// Service for attachment operations.
pub struct AttachmentService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
    config: &'a AttachmentsConfig,
}

impl<'a> AttachmentService<'a> {
    /// Create a new AttachmentService.
    pub fn new(db: &'a Database, storage: &'a FileStorage, config: &'a AttachmentsConfig) -> Self {
        Self {
            db,
            storage,
            config,
        }
    }

    /// Attach a file to a post.
    ///
    /// Only the post's author or a community moderator may upload, and only
    /// while the post is not deleted. Size, extension and per-post count are
    /// limited by [`AttachmentsConfig`].
    pub async fn upload(
        &self,
        post_id: i64,
        user: &User,
        filename: &str,
        content: &[u8],
    ) -> Result<Attachment> {
        let ctx = post_context(self.db, post_id, Some(user)).await?;
        ctx.access.check_board(&ctx.board, Action::UploadAttachment)?;
        if !ctx.access.is_user(ctx.post.author_id) && !ctx.access.is_moderator() {
            return Err(AgoraError::Permission(
                "only the author can attach files to this post".to_string(),
            ));
        }
        if ctx.post.is_deleted {
            return Err(AgoraError::Validation(
                "cannot attach files to a deleted post".to_string(),
            ));
        }

        let original_name = sanitize_filename(filename);
        self.validate_file(&original_name, content)?;

        let repo = AttachmentRepository::new(self.db.pool());
        if repo.count_by_post(post_id).await? >= self.config.max_per_post {
            return Err(AgoraError::Validation(format!(
                "a post can have at most {} attachments",
                self.config.max_per_post
            )));
        }

        let mime_type = mime_guess::from_path(&original_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let stored_name = self.storage.save(content, &original_name)?;

        let created = repo
            .create(&NewAttachment {
                post_id,
                uploader_id: user.id,
                original_name,
                stored_name: stored_name.clone(),
                mime_type,
                size: content.len() as i64,
            })
            .await;
        let attachment = match created {
            Ok(attachment) => attachment,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&stored_name) {
                    warn!(stored_name = %stored_name, error = %cleanup, "Failed to remove orphaned file");
                }
                return Err(e);
            }
        };

        info!(
            attachment_id = attachment.id,
            post_id,
            user_id = user.id,
            size = attachment.size,
            "Attachment uploaded"
        );
        Ok(attachment)
    }

    /// Download an attachment, counting the download.
    pub async fn download(&self, attachment_id: i64, viewer: Option<&User>) -> Result<Download> {
        let attachment = self.get(attachment_id, viewer).await?;
        let content = self.storage.load(&attachment.stored_name)?;
        AttachmentRepository::new(self.db.pool())
            .increment_downloads(attachment_id)
            .await?;
        Ok(Download {
            attachment,
            content,
        })
    }

    /// Attachment metadata, if the viewer can read its board.
    pub async fn get(&self, attachment_id: i64, viewer: Option<&User>) -> Result<Attachment> {
        let attachment = AttachmentRepository::new(self.db.pool())
            .get_by_id(attachment_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("attachment".to_string()))?;
        let ctx = post_context(self.db, attachment.post_id, viewer).await?;
        ctx.access.check_board(&ctx.board, Action::ViewBoard)?;
        if ctx.post.is_deleted && !ctx.access.is_moderator() {
            return Err(AgoraError::NotFound("attachment".to_string()));
        }
        Ok(attachment)
    }

    /// Attachments of a post the viewer can read.
    pub async fn list_for_post(&self, post_id: i64, viewer: Option<&User>) -> Result<Vec<Attachment>> {
        let ctx = post_context(self.db, post_id, viewer).await?;
        ctx.access.check_board(&ctx.board, Action::ViewBoard)?;
        if ctx.post.is_deleted && !ctx.access.is_moderator() {
            return Ok(Vec::new());
        }
        AttachmentRepository::new(self.db.pool())
            .list_by_post(post_id)
            .await
    }

    fn validate_file(&self, name: &str, content: &[u8]) -> Result<()> {
        if content.is_empty() {
            return Err(AgoraError::Validation("file is empty".to_string()));
        }
        if content.len() as u64 > self.config.max_upload_bytes() {
            return Err(AgoraError::Validation(format!(
                "file is too large (max {} MB)",
                self.config.max_upload_size_mb
            )));
        }

        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let allowed = self
            .config
            .allowed_extensions
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&ext));
        if ext.is_empty() || !allowed {
            return Err(AgoraError::Validation(format!(
                "file type not allowed (allowed: {})",
                self.config.allowed_extensions.join(", ")
            )));
        }
        Ok(())
    }
}

/// Reduce an uploaded filename to a safe display name.
///
/// Directory components and control characters are dropped, quotes and
/// backslashes replaced, and the result truncated to
/// [`MAX_FILENAME_LENGTH`] characters.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\'' | '<' | '>' | ':' | '*' | '?' | '|' => '_',
            _ => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        return "file".to_string();
    }
    if cleaned.chars().count() <= MAX_FILENAME_LENGTH {
        return cleaned.to_string();
    }

    // Keep the extension when truncating.
    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if ext.chars().count() < 10 => {
            let keep = MAX_FILENAME_LENGTH - ext.chars().count() - 1;
            format!("{}.{ext}", stem.chars().take(keep).collect::<String>())
        }
        _ => cleaned.chars().take(MAX_FILENAME_LENGTH).collect(),
    }
}

/// `Content-Disposition` value for downloading a file.
///
/// Non-ASCII names get an RFC 5987 `filename*` parameter next to an ASCII
/// fallback.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    if fallback == filename {
        format!("attachment; filename=\"{filename}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(filename)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::{
        BoardRepository, CategoryRepository, CommunityModeratorRepository, CommunityRepository,
        NewBoard, NewCategory, NewCommunity,
    };
    use crate::db::{NewUser, UserRepository};
    use crate::forum::{NewThread, PostRepository, ThreadRepository};
    use tempfile::TempDir;

    struct Fixture {
        db: Database,
        _dir: TempDir,
        storage: FileStorage,
        config: AttachmentsConfig,
        post_id: i64,
        amy: User,
        bob: User,
        modr: User,
    }

    async fn setup() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let pool = db.pool();
        let users = UserRepository::new(pool);
        let amy = users.create(&NewUser::new("amy", "h", "Amy")).await.unwrap();
        let bob = users.create(&NewUser::new("bob", "h", "Bob")).await.unwrap();
        let modr = users.create(&NewUser::new("modr", "h", "Mod")).await.unwrap();
        let community = CommunityRepository::new(pool)
            .create(&NewCommunity::new("rust", "Rust"))
            .await
            .unwrap();
        CommunityModeratorRepository::new(pool)
            .add(community.id, modr.id, None)
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
        let (_, post) = ThreadRepository::new(pool)
            .create_with_first_post(&NewThread::new(board.id, amy.id, "T", "b", "b"))
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let config = AttachmentsConfig {
            max_upload_size_mb: 1,
            max_per_post: 2,
            ..AttachmentsConfig::default()
        };
        Fixture {
            db,
            _dir: dir,
            storage,
            config,
            post_id: post.id,
            amy,
            bob,
            modr,
        }
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let f = setup().await;
        let service = AttachmentService::new(&f.db, &f.storage, &f.config);

        let attachment = service
            .upload(f.post_id, &f.amy, "../../Cat Photo.PNG", b"\x89PNG")
            .await
            .unwrap();
        assert_eq!(attachment.original_name, "Cat Photo.PNG");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.size, 4);
        assert!(f.storage.exists(&attachment.stored_name));

        let download = service.download(attachment.id, None).await.unwrap();
        assert_eq!(download.content, b"\x89PNG");
        let again = service.get(attachment.id, None).await.unwrap();
        assert_eq!(again.download_count, 1);

        assert_eq!(service.list_for_post(f.post_id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_permissions() {
        let f = setup().await;
        let service = AttachmentService::new(&f.db, &f.storage, &f.config);

        let result = service.upload(f.post_id, &f.bob, "a.txt", b"hi").await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));

        service.upload(f.post_id, &f.modr, "a.txt", b"hi").await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_limits() {
        let f = setup().await;
        let service = AttachmentService::new(&f.db, &f.storage, &f.config);

        let result = service.upload(f.post_id, &f.amy, "run.exe", b"MZ").await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));
        let result = service.upload(f.post_id, &f.amy, "noext", b"x").await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));
        let result = service.upload(f.post_id, &f.amy, "empty.txt", b"").await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));

        let big = vec![0u8; 1024 * 1024 + 1];
        let result = service.upload(f.post_id, &f.amy, "big.zip", &big).await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));

        service.upload(f.post_id, &f.amy, "1.txt", b"1").await.unwrap();
        service.upload(f.post_id, &f.amy, "2.txt", b"2").await.unwrap();
        let result = service.upload(f.post_id, &f.amy, "3.txt", b"3").await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));
    }

    #[tokio::test]
    async fn test_deleted_post() {
        let f = setup().await;
        let service = AttachmentService::new(&f.db, &f.storage, &f.config);
        let attachment = service.upload(f.post_id, &f.amy, "a.txt", b"a").await.unwrap();

        PostRepository::new(f.db.pool())
            .soft_delete(f.post_id, f.amy.id)
            .await
            .unwrap();

        let result = service.upload(f.post_id, &f.amy, "b.txt", b"b").await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));
        let result = service.download(attachment.id, Some(&f.bob)).await;
        assert!(matches!(result, Err(AgoraError::NotFound(_))));
        assert!(service.list_for_post(f.post_id, None).await.unwrap().is_empty());
        service.download(attachment.id, Some(&f.modr)).await.unwrap();
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("C:\\Users\\me\\report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("a\"b\r\n.txt"), "a_b.txt");
        assert_eq!(sanitize_filename("..."), "file");
        assert_eq!(sanitize_filename(".bashrc"), "bashrc");
        assert_eq!(sanitize_filename(""), "file");

        let long = format!("{}.png", "x".repeat(200));
        let cut = sanitize_filename(&long);
        assert_eq!(cut.chars().count(), MAX_FILENAME_LENGTH);
        assert!(cut.ends_with(".png"));
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        let header = content_disposition("résumé.pdf");
        assert!(header.contains("filename=\"r_sum_.pdf\""));
        assert!(header.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
        let header = content_disposition("a\"b.txt");
        assert!(header.contains("filename=\"a_b.txt\""));
        assert!(header.contains("%22"));
    }
}
