//! Loading forum objects together with the caller's community access.

use super::post::Post;
use super::post_repository::PostRepository;
use super::thread::Thread;
use super::thread_repository::ThreadRepository;
use crate::auth::{resolve_access, CommunityAccess};
use crate::community::{Board, BoardRepository};
use crate::db::{Database, User};
use crate::{AgoraError, Result};

/// A board together with the caller's access to it.
#[derive(Debug, Clone)]
pub struct BoardContext {
    /// The board.
    pub board: Board,
    /// Caller's access in the board's community.
    pub access: CommunityAccess,
}

/// A thread together with its board and the caller's access.
#[derive(Debug, Clone)]
pub struct ThreadContext {
    /// The thread.
    pub thread: Thread,
    /// Board containing the thread.
    pub board: Board,
    /// Caller's access in the board's community.
    pub access: CommunityAccess,
}

/// A post together with its thread, board and the caller's access.
#[derive(Debug, Clone)]
pub struct PostContext {
    /// The post.
    pub post: Post,
    /// Thread containing the post.
    pub thread: Thread,
    /// Board containing the thread.
    pub board: Board,
    /// Caller's access in the board's community.
    pub access: CommunityAccess,
}

/// Load a board and resolve the caller's access to it.
pub async fn board_context(db: &Database, board_id: i64, user: Option<&User>) -> Result<BoardContext> {
    let board = BoardRepository::new(db.pool())
        .get_by_id(board_id)
        .await?
        .ok_or_else(|| AgoraError::NotFound("board".to_string()))?;
    let access = resolve_access(db.pool(), user, board.community_id).await?;
    Ok(BoardContext { board, access })
}

/// Load a thread and resolve the caller's access to it.
pub async fn thread_context(
    db: &Database,
    thread_id: i64,
    user: Option<&User>,
) -> Result<ThreadContext> {
    let thread = ThreadRepository::new(db.pool())
        .get_by_id(thread_id)
        .await?
        .ok_or_else(|| AgoraError::NotFound("thread".to_string()))?;
    let BoardContext { board, access } = board_context(db, thread.board_id, user).await?;
    Ok(ThreadContext {
        thread,
        board,
        access,
    })
}

/// Load a post and resolve the caller's access to it.
pub async fn post_context(db: &Database, post_id: i64, user: Option<&User>) -> Result<PostContext> {
    let post = PostRepository::new(db.pool())
        .get_by_id(post_id)
        .await?
        .ok_or_else(|| AgoraError::NotFound("post".to_string()))?;
    let ThreadContext {
        thread,
        board,
        access,
    } = thread_context(db, post.thread_id, user).await?;
    Ok(PostContext {
        post,
        thread,
        board,
        access,
    })
}
