//! Thread model for Agora.

/// A discussion thread in a board.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Thread {
    /// Unique thread ID.
    pub id: i64,
    /// Board the thread belongs to.
    pub board_id: i64,
    /// Author of the opening post.
    pub author_id: i64,
    /// Author's username.
    pub author_username: String,
    /// Author's display name.
    pub author_display_name: String,
    /// Thread title.
    pub title: String,
    /// Locked threads accept replies from moderators only.
    pub is_locked: bool,
    /// Sticky threads are listed before all others.
    pub is_sticky: bool,
    /// Number of posts, including soft-deleted ones.
    pub post_count: i64,
    /// Number of views.
    pub view_count: i64,
    /// Newest post.
    pub last_post_id: Option<i64>,
    /// Time of the newest post.
    pub last_post_at: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Data for creating a thread together with its first post.
#[derive(Debug, Clone)]
pub struct NewThread {
    /// Board to create the thread in.
    pub board_id: i64,
    /// Author.
    pub author_id: i64,
    /// Title.
    pub title: String,
    /// BBCode body of the first post.
    pub body_raw: String,
    /// Rendered HTML of the first post.
    pub body_html: String,
}

impl NewThread {
    /// Create a new thread with required fields.
    pub fn new(
        board_id: i64,
        author_id: i64,
        title: impl Into<String>,
        body_raw: impl Into<String>,
        body_html: impl Into<String>,
    ) -> Self {
        Self {
            board_id,
            author_id,
            title: title.into(),
            body_raw: body_raw.into(),
            body_html: body_html.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_thread() {
        let thread = NewThread::new(1, 42, "Hello", "[b]hi[/b]", "<strong>hi</strong>");
        assert_eq!(thread.board_id, 1);
        assert_eq!(thread.author_id, 42);
        assert_eq!(thread.title, "Hello");
        assert_eq!(thread.body_raw, "[b]hi[/b]");
    }
}
