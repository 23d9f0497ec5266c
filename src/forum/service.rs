//! Forum service for Agora.
//!
//! Every operation resolves the caller's `CommunityAccess` for the board's
//! community and checks it before touching the database.

use tracing::{debug, info, warn};

use super::context::{board_context, post_context, thread_context, PostContext, ThreadContext};
use super::post::{NewPost, Post};
use super::post_repository::PostRepository;
use super::thread::{NewThread, Thread};
use super::thread_repository::ThreadRepository;
use crate::attachment::{AttachmentRepository, FileStorage};
use crate::auth::Action;
use crate::bbcode;
use crate::community::{Board, BoardRepository};
use crate::config::ForumConfig;
use crate::datetime::parse_sql_datetime;
use crate::db::{Database, User, UserRepository};
use crate::moderation::{ModLogRepository, NewModLogEntry};
use crate::notification::NotificationService;
use crate::{AgoraError, Result};

/// Largest page size a caller may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    /// Number of items to skip.
    pub offset: i64,
    /// Maximum number of items to return.
    pub limit: i64,
}

impl Pagination {
    /// Create new pagination parameters.
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }

    /// Pagination for a 1-based page number.
    ///
    /// Page 0 is treated as page 1 and `per_page` is clamped to 1..=100.
    pub fn page(page: u32, per_page: u32) -> Self {
        let per_page = i64::from(per_page.clamp(1, MAX_PER_PAGE));
        let page = i64::from(page.max(1));
        Self {
            offset: (page - 1) * per_page,
            limit: per_page,
        }
    }
}

/// Result of a paginated query.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Total number of items (across all pages).
    pub total: i64,
    /// Current offset.
    pub offset: i64,
    /// Limit used for this query.
    pub limit: i64,
}

impl<T> PaginatedResult<T> {
    /// Build a result from a page of items.
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        }
    }

    /// 1-based page number of this result.
    pub fn page(&self) -> i64 {
        if self.limit <= 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }

    /// Check if there are more items after this page.
    pub fn has_more(&self) -> bool {
        self.offset + (self.items.len() as i64) < self.total
    }

    /// Convert the items, keeping the paging data.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// Service for threads and posts.
pub struct ForumService<'a> {
    db: &'a Database,
    config: &'a ForumConfig,
    storage: Option<&'a FileStorage>,
}

impl<'a> ForumService<'a> {
    /// Create a new ForumService.
    pub fn new(db: &'a Database, config: &'a ForumConfig) -> Self {
        Self {
            db,
            config,
            storage: None,
        }
    }

    /// Attach the file storage used to remove attachments of deleted threads.
    pub fn with_storage(mut self, storage: &'a FileStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// List threads in a board, sticky threads first.
    pub async fn list_threads(
        &self,
        board_id: i64,
        user: Option<&User>,
        pagination: Pagination,
    ) -> Result<(Board, PaginatedResult<Thread>)> {
        let ctx = board_context(self.db, board_id, user).await?;
        ctx.access.check_board(&ctx.board, Action::ViewBoard)?;

        let repo = ThreadRepository::new(self.db.pool());
        let total = repo.count_by_board(board_id).await?;
        let items = repo
            .list_by_board(board_id, pagination.offset, pagination.limit)
            .await?;

        Ok((ctx.board, PaginatedResult::new(items, total, pagination)))
    }

    /// Get a thread, counting the view.
    pub async fn get_thread(&self, thread_id: i64, user: Option<&User>) -> Result<ThreadContext> {
        let mut ctx = thread_context(self.db, thread_id, user).await?;
        ctx.access.check_board(&ctx.board, Action::ViewBoard)?;

        ThreadRepository::new(self.db.pool())
            .increment_view_count(thread_id)
            .await?;
        ctx.thread.view_count += 1;
        Ok(ctx)
    }

    /// List the posts of a thread. Deleted posts keep their slot with an empty body.
    pub async fn list_posts(
        &self,
        thread_id: i64,
        user: Option<&User>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Post>> {
        let ctx = thread_context(self.db, thread_id, user).await?;
        ctx.access.check_board(&ctx.board, Action::ViewBoard)?;

        let repo = PostRepository::new(self.db.pool());
        let total = repo.count_by_thread(thread_id).await?;
        let items = repo
            .list_by_thread(thread_id, pagination.offset, pagination.limit)
            .await?
            .into_iter()
            .map(Post::redacted)
            .collect();

        Ok(PaginatedResult::new(items, total, pagination))
    }

    /// Get a single post. The body of a deleted post is hidden.
    pub async fn get_post(&self, post_id: i64, user: Option<&User>) -> Result<PostContext> {
        let mut ctx = post_context(self.db, post_id, user).await?;
        ctx.access.check_board(&ctx.board, Action::ViewBoard)?;
        ctx.post = ctx.post.redacted();
        Ok(ctx)
    }

    /// Start a new thread with its first post.
    pub async fn create_thread(
        &self,
        board_id: i64,
        author: &User,
        title: &str,
        body: &str,
    ) -> Result<(Thread, Post)> {
        let ctx = board_context(self.db, board_id, Some(author)).await?;
        ctx.access.check_board(&ctx.board, Action::CreateThread)?;

        let title = self.validate_title(title)?;
        let body = self.validate_body(body)?;
        let html = bbcode::render(body);

        let (thread, post) = ThreadRepository::new(self.db.pool())
            .create_with_first_post(&NewThread::new(board_id, author.id, title, body, html))
            .await?;

        UserRepository::new(self.db.pool())
            .increment_post_count(author.id)
            .await?;

        info!(
            thread_id = thread.id,
            board_id,
            author_id = author.id,
            "Thread created"
        );

        NotificationService::new(self.db)
            .notify_mentions(&ctx.board, &thread, &post, author, None)
            .await?;

        Ok((thread, post))
    }

    /// Reply to a thread.
    ///
    /// Locked threads only accept replies from callers with `ReplyToLocked`.
    pub async fn reply(&self, thread_id: i64, author: &User, body: &str) -> Result<Post> {
        let ctx = thread_context(self.db, thread_id, Some(author)).await?;
        let action = if ctx.thread.is_locked {
            Action::ReplyToLocked
        } else {
            Action::Reply
        };
        ctx.access.check_board(&ctx.board, action)?;

        let body = self.validate_body(body)?;
        let html = bbcode::render(body);

        let post = PostRepository::new(self.db.pool())
            .create_reply(&NewPost::new(thread_id, author.id, body, html))
            .await?;

        UserRepository::new(self.db.pool())
            .increment_post_count(author.id)
            .await?;

        debug!(post_id = post.id, thread_id, author_id = author.id, "Reply posted");

        let notifications = NotificationService::new(self.db);
        let mentioned = notifications
            .notify_mentions(&ctx.board, &ctx.thread, &post, author, None)
            .await?;
        notifications
            .notify_reply(&ctx.thread, &post, author, &mentioned)
            .await?;

        Ok(post)
    }

    /// Edit a post's body.
    ///
    /// Authors may edit their own posts while the thread is unlocked and the
    /// edit window (if any) is open. Moderators may edit any post.
    pub async fn edit_post(&self, post_id: i64, editor: &User, body: &str) -> Result<Post> {
        let ctx = post_context(self.db, post_id, Some(editor)).await?;
        if ctx.post.is_deleted {
            return Err(AgoraError::Validation(
                "deleted posts cannot be edited".to_string(),
            ));
        }

        let by_moderator = ctx.access.check_board(&ctx.board, Action::EditAnyPost).is_ok();
        if !by_moderator {
            if !ctx.access.is_user(ctx.post.author_id) {
                ctx.access.check_board(&ctx.board, Action::EditAnyPost)?;
            }
            ctx.access.check_board(&ctx.board, Action::EditOwnPost)?;
            if ctx.thread.is_locked {
                return Err(AgoraError::Permission("thread is locked".to_string()));
            }
            if !self.within_edit_window(&ctx.post) {
                return Err(AgoraError::Permission(
                    "the edit window for this post has closed".to_string(),
                ));
            }
        }

        let body = self.validate_body(body)?;
        let html = bbcode::render(body);
        let previous = ctx.post.body_raw.clone();

        let post = PostRepository::new(self.db.pool())
            .update_body(post_id, body, &html, editor.id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("post".to_string()))?;

        if by_moderator && !ctx.access.is_user(ctx.post.author_id) {
            ModLogRepository::new(self.db.pool())
                .append(&NewModLogEntry::post_action(
                    Some(ctx.board.community_id),
                    editor.id,
                    "edit_post",
                    post_id,
                    None,
                ))
                .await?;
        }

        info!(post_id, editor_id = editor.id, "Post edited");

        NotificationService::new(self.db)
            .notify_mentions(&ctx.board, &ctx.thread, &post, editor, Some(&previous))
            .await?;

        Ok(post)
    }

    /// Soft-delete a post. Authors delete their own posts; moderators any post.
    pub async fn delete_post(&self, post_id: i64, actor: &User) -> Result<()> {
        let ctx = post_context(self.db, post_id, Some(actor)).await?;
        let own = ctx.access.is_user(ctx.post.author_id);
        let action = if own {
            Action::DeleteOwnPost
        } else {
            Action::DeleteAnyPost
        };
        ctx.access.check_board(&ctx.board, action)?;

        if !PostRepository::new(self.db.pool())
            .soft_delete(post_id, actor.id)
            .await?
        {
            return Err(AgoraError::NotFound("post".to_string()));
        }

        info!(post_id, actor_id = actor.id, "Post deleted");

        if !own {
            ModLogRepository::new(self.db.pool())
                .append(&NewModLogEntry::post_action(
                    Some(ctx.board.community_id),
                    actor.id,
                    "delete_post",
                    post_id,
                    None,
                ))
                .await?;
            NotificationService::new(self.db)
                .notify_moderation(
                    ctx.post.author_id,
                    actor.id,
                    Some(ctx.thread.id),
                    None,
                    &format!("Your post in \"{}\" was removed by a moderator", ctx.thread.title),
                )
                .await?;
        }
        Ok(())
    }

    /// Permanently delete a thread with its posts and attachment files.
    pub async fn delete_thread(&self, thread_id: i64, actor: &User) -> Result<()> {
        let ctx = thread_context(self.db, thread_id, Some(actor)).await?;
        ctx.access.check_board(&ctx.board, Action::DeleteThread)?;

        let stored_names = AttachmentRepository::new(self.db.pool())
            .stored_names_for_thread(thread_id)
            .await?;

        if !ThreadRepository::new(self.db.pool()).delete(thread_id).await? {
            return Err(AgoraError::NotFound("thread".to_string()));
        }

        if let Some(storage) = self.storage {
            for name in &stored_names {
                if let Err(e) = storage.delete(name) {
                    warn!(stored_name = %name, error = %e, "Failed to remove attachment file");
                }
            }
        }

        ModLogRepository::new(self.db.pool())
            .append(&NewModLogEntry::thread_action(
                Some(ctx.board.community_id),
                actor.id,
                "delete_thread",
                thread_id,
                Some(ctx.thread.title.clone()),
            ))
            .await?;

        info!(thread_id, actor_id = actor.id, files = stored_names.len(), "Thread deleted");
        Ok(())
    }

    /// Lock or unlock a thread.
    pub async fn set_locked(&self, thread_id: i64, actor: &User, locked: bool) -> Result<Thread> {
        let ctx = thread_context(self.db, thread_id, Some(actor)).await?;
        ctx.access.check_board(&ctx.board, Action::LockThread)?;

        let repo = ThreadRepository::new(self.db.pool());
        repo.set_locked(thread_id, locked).await?;

        let action = if locked { "lock_thread" } else { "unlock_thread" };
        ModLogRepository::new(self.db.pool())
            .append(&NewModLogEntry::thread_action(
                Some(ctx.board.community_id),
                actor.id,
                action,
                thread_id,
                None,
            ))
            .await?;

        if locked && !ctx.thread.is_locked && ctx.thread.author_id != actor.id {
            NotificationService::new(self.db)
                .notify_moderation(
                    ctx.thread.author_id,
                    actor.id,
                    Some(thread_id),
                    None,
                    &format!("Your thread \"{}\" was locked", ctx.thread.title),
                )
                .await?;
        }

        info!(thread_id, actor_id = actor.id, locked, "Thread lock changed");
        repo.get_by_id(thread_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("thread".to_string()))
    }

    /// Pin or unpin a thread.
    pub async fn set_sticky(&self, thread_id: i64, actor: &User, sticky: bool) -> Result<Thread> {
        let ctx = thread_context(self.db, thread_id, Some(actor)).await?;
        ctx.access.check_board(&ctx.board, Action::StickyThread)?;

        let repo = ThreadRepository::new(self.db.pool());
        repo.set_sticky(thread_id, sticky).await?;

        let action = if sticky { "sticky_thread" } else { "unsticky_thread" };
        ModLogRepository::new(self.db.pool())
            .append(&NewModLogEntry::thread_action(
                Some(ctx.board.community_id),
                actor.id,
                action,
                thread_id,
                None,
            ))
            .await?;

        info!(thread_id, actor_id = actor.id, sticky, "Thread sticky changed");
        repo.get_by_id(thread_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("thread".to_string()))
    }

    /// Move a thread to another board of the same community.
    pub async fn move_thread(&self, thread_id: i64, actor: &User, to_board_id: i64) -> Result<Thread> {
        let ctx = thread_context(self.db, thread_id, Some(actor)).await?;
        ctx.access.check_board(&ctx.board, Action::MoveThread)?;

        let target = BoardRepository::new(self.db.pool())
            .get_by_id(to_board_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("board".to_string()))?;
        if target.community_id != ctx.board.community_id {
            return Err(AgoraError::Validation(
                "threads can only move within their community".to_string(),
            ));
        }
        ctx.access.check_board(&target, Action::MoveThread)?;

        let thread = ThreadRepository::new(self.db.pool())
            .move_to_board(thread_id, to_board_id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("thread".to_string()))?;

        ModLogRepository::new(self.db.pool())
            .append(&NewModLogEntry::thread_action(
                Some(ctx.board.community_id),
                actor.id,
                "move_thread",
                thread_id,
                Some(format!("{} -> {}", ctx.board.slug, target.slug)),
            ))
            .await?;

        info!(
            thread_id,
            from_board_id = ctx.board.id,
            to_board_id,
            actor_id = actor.id,
            "Thread moved"
        );
        Ok(thread)
    }

    fn validate_title<'t>(&self, title: &'t str) -> Result<&'t str> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AgoraError::Validation("title cannot be empty".to_string()));
        }
        if title.chars().count() > self.config.max_title_length {
            return Err(AgoraError::Validation(format!(
                "title must be at most {} characters",
                self.config.max_title_length
            )));
        }
        Ok(title)
    }

    fn validate_body<'b>(&self, body: &'b str) -> Result<&'b str> {
        if body.trim().is_empty() {
            return Err(AgoraError::Validation("body cannot be empty".to_string()));
        }
        if body.chars().count() > self.config.max_body_length {
            return Err(AgoraError::Validation(format!(
                "body must be at most {} characters",
                self.config.max_body_length
            )));
        }
        Ok(body)
    }

    fn within_edit_window(&self, post: &Post) -> bool {
        if self.config.edit_window_secs <= 0 {
            return true;
        }
        match parse_sql_datetime(&post.created_at) {
            Some(created) => {
                (chrono::Utc::now() - created).num_seconds() <= self.config.edit_window_secs
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::{
        BoardRepository, CategoryRepository, CommunityModeratorRepository, CommunityRepository,
        NewBoard, NewCategory, NewCommunity,
    };
    use crate::db::{NewUser, Role};
    use crate::moderation::{BanRepository, NewBan};
    use crate::notification::NotificationRepository;

    struct Fixture {
        db: Database,
        config: ForumConfig,
        community_id: i64,
        board: Board,
        other_board: Board,
        alice: User,
        bob: User,
        modr: User,
    }

    async fn setup() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let pool = db.pool();
        let users = UserRepository::new(pool);
        let alice = users
            .create(&NewUser::new("alice", "h", "Alice"))
            .await
            .unwrap();
        let bob = users.create(&NewUser::new("bob", "h", "Bob")).await.unwrap();
        let modr = users
            .create(&NewUser::new("modr", "h", "Mod"))
            .await
            .unwrap();
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
        let boards = BoardRepository::new(pool);
        let board = boards
            .create(&NewBoard::new(community.id, category.id, "help", "Help"))
            .await
            .unwrap();
        let other_board = boards
            .create(&NewBoard::new(community.id, category.id, "news", "News"))
            .await
            .unwrap();
        Fixture {
            db,
            config: ForumConfig::default(),
            community_id: community.id,
            board,
            other_board,
            alice,
            bob,
            modr,
        }
    }

    #[test]
    fn test_pagination_page() {
        let p = Pagination::page(3, 20);
        assert_eq!((p.offset, p.limit), (40, 20));
        let p = Pagination::page(0, 0);
        assert_eq!((p.offset, p.limit), (0, 1));
        let p = Pagination::page(1, 1000);
        assert_eq!(p.limit, i64::from(MAX_PER_PAGE));
    }

    #[test]
    fn test_paginated_result_page_number() {
        let result = PaginatedResult::new(vec![1, 2], 5, Pagination::page(2, 2));
        assert_eq!(result.page(), 2);
        assert!(result.has_more());
        let mapped = result.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
    }

    #[tokio::test]
    async fn test_create_thread_and_reply() {
        let f = setup().await;
        let service = ForumService::new(&f.db, &f.config);

        let (thread, first) = service
            .create_thread(f.board.id, &f.alice, "  Hello  ", "[b]hi[/b]")
            .await
            .unwrap();
        assert_eq!(thread.title, "Hello");
        assert_eq!(first.body_html, "<strong>hi</strong>");

        service.reply(thread.id, &f.bob, "welcome").await.unwrap();

        let posts = service
            .list_posts(thread.id, None, Pagination::page(1, 20))
            .await
            .unwrap();
        assert_eq!(posts.total, 2);
        assert_eq!(posts.items[1].author_username, "bob");

        let alice = UserRepository::new(f.db.pool())
            .get_by_id(f.alice.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.post_count, 1);

        let ctx = service.get_thread(thread.id, None).await.unwrap();
        assert_eq!(ctx.thread.post_count, 2);
        assert_eq!(ctx.thread.view_count, 1);
    }

    #[tokio::test]
    async fn test_create_thread_validation() {
        let f = setup().await;
        let service = ForumService::new(&f.db, &f.config);

        let result = service.create_thread(f.board.id, &f.alice, "   ", "body").await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));

        let long_title = "x".repeat(f.config.max_title_length + 1);
        let result = service
            .create_thread(f.board.id, &f.alice, &long_title, "body")
            .await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));

        let result = service.create_thread(f.board.id, &f.alice, "t", " \n ").await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));
    }

    #[tokio::test]
    async fn test_guest_and_banned_cannot_post() {
        let f = setup().await;
        let service = ForumService::new(&f.db, &f.config);
        let (thread, _) = service
            .create_thread(f.board.id, &f.alice, "T", "body")
            .await
            .unwrap();

        BanRepository::new(f.db.pool())
            .create(&NewBan {
                user_id: f.bob.id,
                community_id: Some(f.community_id),
                reason: "spam".to_string(),
                banned_by: Some(f.modr.id),
                expires_at: None,
            })
            .await
            .unwrap();

        let result = service.reply(thread.id, &f.bob, "hi").await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));

        // Banned users can still read.
        let posts = service
            .list_posts(thread.id, Some(&f.bob), Pagination::page(1, 20))
            .await
            .unwrap();
        assert_eq!(posts.total, 1);
    }

    #[tokio::test]
    async fn test_locked_thread_rules() {
        let f = setup().await;
        let service = ForumService::new(&f.db, &f.config);
        let (thread, first) = service
            .create_thread(f.board.id, &f.alice, "T", "body")
            .await
            .unwrap();

        let result = service.set_locked(thread.id, &f.alice, true).await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));

        let locked = service.set_locked(thread.id, &f.modr, true).await.unwrap();
        assert!(locked.is_locked);

        let result = service.reply(thread.id, &f.bob, "late").await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));
        let result = service.edit_post(first.id, &f.alice, "changed").await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));

        service.reply(thread.id, &f.modr, "closing").await.unwrap();
        service
            .edit_post(first.id, &f.modr, "moderated")
            .await
            .unwrap();

        let notes = NotificationRepository::new(f.db.pool())
            .list_for_user(f.alice.id, false, 0, 10)
            .await
            .unwrap();
        assert!(notes.iter().any(|n| n.kind.as_str() == "moderation"));
    }

    #[tokio::test]
    async fn test_edit_post_permissions() {
        let f = setup().await;
        let service = ForumService::new(&f.db, &f.config);
        let (_, first) = service
            .create_thread(f.board.id, &f.alice, "T", "old")
            .await
            .unwrap();

        let result = service.edit_post(first.id, &f.bob, "hijack").await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));

        let edited = service
            .edit_post(first.id, &f.alice, "[i]new[/i]")
            .await
            .unwrap();
        assert_eq!(edited.body_html, "<em>new</em>");
        assert_eq!(edited.edited_by, Some(f.alice.id));
    }

    #[tokio::test]
    async fn test_edit_window() {
        let mut f = setup().await;
        f.config.edit_window_secs = 60;
        let service = ForumService::new(&f.db, &f.config);
        let (_, first) = service
            .create_thread(f.board.id, &f.alice, "T", "old")
            .await
            .unwrap();

        sqlx::query("UPDATE posts SET created_at = datetime('now', '-1 hour') WHERE id = ?")
            .bind(first.id)
            .execute(f.db.pool())
            .await
            .unwrap();

        let result = service.edit_post(first.id, &f.alice, "late").await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));
        service.edit_post(first.id, &f.modr, "mod").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_post_hides_body() {
        let f = setup().await;
        let service = ForumService::new(&f.db, &f.config);
        let (thread, _) = service
            .create_thread(f.board.id, &f.alice, "T", "first")
            .await
            .unwrap();
        let reply = service.reply(thread.id, &f.bob, "oops").await.unwrap();

        let result = service.delete_post(reply.id, &f.alice).await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));

        service.delete_post(reply.id, &f.bob).await.unwrap();
        let posts = service
            .list_posts(thread.id, None, Pagination::page(1, 20))
            .await
            .unwrap();
        assert_eq!(posts.items.len(), 2);
        assert!(posts.items[1].is_deleted);
        assert!(posts.items[1].body_raw.is_empty());

        let result = service.edit_post(reply.id, &f.bob, "again").await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));
    }

    #[tokio::test]
    async fn test_moderator_delete_logs_and_notifies() {
        let f = setup().await;
        let service = ForumService::new(&f.db, &f.config);
        let (_, first) = service
            .create_thread(f.board.id, &f.alice, "T", "first")
            .await
            .unwrap();

        service.delete_post(first.id, &f.modr).await.unwrap();

        let log = ModLogRepository::new(f.db.pool())
            .list_by_community(Some(f.community_id), 0, 10)
            .await
            .unwrap();
        assert_eq!(log[0].action, "delete_post");
        assert_eq!(log[0].target_id, first.id);

        let unread = NotificationRepository::new(f.db.pool())
            .unread_count(f.alice.id)
            .await
            .unwrap();
        assert_eq!(unread, 1);
    }

    #[tokio::test]
    async fn test_sticky_and_move() {
        let f = setup().await;
        let service = ForumService::new(&f.db, &f.config);
        let (a, _) = service
            .create_thread(f.board.id, &f.alice, "A", "a")
            .await
            .unwrap();
        service
            .create_thread(f.board.id, &f.alice, "B", "b")
            .await
            .unwrap();

        service.set_sticky(a.id, &f.modr, true).await.unwrap();
        let (_, threads) = service
            .list_threads(f.board.id, None, Pagination::page(1, 20))
            .await
            .unwrap();
        assert_eq!(threads.items[0].id, a.id);

        let result = service.move_thread(a.id, &f.bob, f.other_board.id).await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));

        let moved = service
            .move_thread(a.id, &f.modr, f.other_board.id)
            .await
            .unwrap();
        assert_eq!(moved.board_id, f.other_board.id);

        let boards = BoardRepository::new(f.db.pool());
        assert_eq!(boards.get_by_id(f.board.id).await.unwrap().unwrap().thread_count, 1);
        assert_eq!(
            boards
                .get_by_id(f.other_board.id)
                .await
                .unwrap()
                .unwrap()
                .thread_count,
            1
        );
    }

    #[tokio::test]
    async fn test_move_across_communities_rejected() {
        let f = setup().await;
        let pool = f.db.pool();
        let service = ForumService::new(&f.db, &f.config);
        let (thread, _) = service
            .create_thread(f.board.id, &f.alice, "A", "a")
            .await
            .unwrap();

        let elsewhere = CommunityRepository::new(pool)
            .create(&NewCommunity::new("go", "Go"))
            .await
            .unwrap();
        let category = CategoryRepository::new(pool)
            .create(&NewCategory::new(elsewhere.id, "Misc"))
            .await
            .unwrap();
        let foreign = BoardRepository::new(pool)
            .create(&NewBoard::new(elsewhere.id, category.id, "misc", "Misc"))
            .await
            .unwrap();

        let result = service.move_thread(thread.id, &f.modr, foreign.id).await;
        assert!(matches!(result, Err(AgoraError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_thread() {
        let f = setup().await;
        let service = ForumService::new(&f.db, &f.config);
        let (thread, _) = service
            .create_thread(f.board.id, &f.alice, "A", "a")
            .await
            .unwrap();

        let result = service.delete_thread(thread.id, &f.alice).await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));

        service.delete_thread(thread.id, &f.modr).await.unwrap();
        let result = service.get_thread(thread.id, None).await;
        assert!(matches!(result, Err(AgoraError::NotFound(_))));

        let board = BoardRepository::new(f.db.pool())
            .get_by_id(f.board.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((board.thread_count, board.post_count), (0, 0));
    }

    #[tokio::test]
    async fn test_restricted_board_hidden_from_guests() {
        let f = setup().await;
        let pool = f.db.pool();
        let staff = BoardRepository::new(pool)
            .create(
                &NewBoard::new(f.community_id, f.board.category_id, "staff", "Staff")
                    .with_min_read_role(Role::Moderator),
            )
            .await
            .unwrap();
        let service = ForumService::new(&f.db, &f.config);

        let result = service.create_thread(staff.id, &f.alice, "T", "b").await;
        assert!(matches!(result, Err(AgoraError::Permission(_))));
        let result = service
            .list_threads(staff.id, None, Pagination::page(1, 20))
            .await;
        assert!(matches!(result, Err(AgoraError::Auth(_))));

        service
            .create_thread(staff.id, &f.modr, "T", "b")
            .await
            .unwrap();
    }
}
