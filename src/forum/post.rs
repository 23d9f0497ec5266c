//! Post model for Agora.

/// A message in a thread.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    /// Unique post ID.
    pub id: i64,
    /// Thread the post belongs to.
    pub thread_id: i64,
    /// Author.
    pub author_id: i64,
    /// Author's username.
    pub author_username: String,
    /// Author's display name.
    pub author_display_name: String,
    /// BBCode source.
    pub body_raw: String,
    /// Rendered HTML.
    pub body_html: String,
    /// Soft-deletion flag.
    pub is_deleted: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last edit timestamp.
    pub edited_at: Option<String>,
    /// User who made the last edit.
    pub edited_by: Option<i64>,
}

impl Post {
    /// Blank out the body of a deleted post, keeping its slot.
    pub fn redacted(mut self) -> Self {
        if self.is_deleted {
            self.body_raw.clear();
            self.body_html.clear();
        }
        self
    }
}

/// Data for a reply.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Thread to reply in.
    pub thread_id: i64,
    /// Author.
    pub author_id: i64,
    /// BBCode source.
    pub body_raw: String,
    /// Rendered HTML.
    pub body_html: String,
}

impl NewPost {
    /// Create a new reply with required fields.
    pub fn new(
        thread_id: i64,
        author_id: i64,
        body_raw: impl Into<String>,
        body_html: impl Into<String>,
    ) -> Self {
        Self {
            thread_id,
            author_id,
            body_raw: body_raw.into(),
            body_html: body_html.into(),
        }
    }
}
