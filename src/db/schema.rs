//! Database schema definitions for Agora.
//!
//! Each entry in [`MIGRATIONS`] is one schema version. Entries are applied in
//! order and never edited once released; schema changes go in a new entry.

/// Ordered list of migration batches. Version N is `MIGRATIONS[N - 1]`.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users and login sessions
    r#"
CREATE TABLE users (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    username     TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password     TEXT NOT NULL,
    display_name TEXT NOT NULL,
    email        TEXT,
    role         TEXT NOT NULL DEFAULT 'member',
    profile      TEXT,
    signature    TEXT,
    post_count   INTEGER NOT NULL DEFAULT 0,
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    last_login   TEXT
);

CREATE INDEX idx_users_role ON users(role);

CREATE TABLE sessions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash   TEXT NOT NULL UNIQUE,
    ip_address   TEXT,
    user_agent   TEXT,
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    last_seen_at TEXT NOT NULL DEFAULT (datetime('now')),
    expires_at   TEXT NOT NULL
);

CREATE INDEX idx_sessions_user_id ON sessions(user_id);
CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
"#,
    // v2: Communities, categories, boards and community moderators
    r#"
CREATE TABLE communities (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    slug        TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE categories (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    community_id INTEGER NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    sort_order   INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_categories_community_id ON categories(community_id);

CREATE TABLE boards (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    community_id   INTEGER NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
    category_id    INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    slug           TEXT NOT NULL,
    name           TEXT NOT NULL,
    description    TEXT,
    sort_order     INTEGER NOT NULL DEFAULT 0,
    min_read_role  TEXT NOT NULL DEFAULT 'guest',
    min_write_role TEXT NOT NULL DEFAULT 'member',
    thread_count   INTEGER NOT NULL DEFAULT 0,
    post_count     INTEGER NOT NULL DEFAULT 0,
    last_post_at   TEXT,
    created_at     TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(community_id, slug)
);

CREATE INDEX idx_boards_category_id ON boards(category_id);

CREATE TABLE community_moderators (
    community_id INTEGER NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
    user_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    added_by     INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (community_id, user_id)
);

CREATE INDEX idx_community_moderators_user_id ON community_moderators(user_id);
"#,
    // v3: Threads and posts
    r#"
CREATE TABLE threads (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    board_id     INTEGER NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
    author_id    INTEGER NOT NULL REFERENCES users(id),
    title        TEXT NOT NULL,
    is_locked    INTEGER NOT NULL DEFAULT 0,
    is_sticky    INTEGER NOT NULL DEFAULT 0,
    post_count   INTEGER NOT NULL DEFAULT 0,
    view_count   INTEGER NOT NULL DEFAULT 0,
    last_post_id INTEGER,
    last_post_at TEXT NOT NULL DEFAULT (datetime('now')),
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_threads_board_listing ON threads(board_id, is_sticky, last_post_at);
CREATE INDEX idx_threads_author_id ON threads(author_id);

CREATE TABLE posts (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id  INTEGER NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
    author_id  INTEGER NOT NULL REFERENCES users(id),
    body_raw   TEXT NOT NULL,
    body_html  TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    edited_at  TEXT,
    edited_by  INTEGER REFERENCES users(id) ON DELETE SET NULL
);

CREATE INDEX idx_posts_thread_order ON posts(thread_id, created_at, id);
CREATE INDEX idx_posts_author_id ON posts(author_id);
"#,
    // v4: Reactions and notifications
    r#"
CREATE TABLE reactions (
    post_id    INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    kind       TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (post_id, user_id, kind)
);

CREATE INDEX idx_reactions_post_id ON reactions(post_id);

CREATE TABLE notifications (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    kind       TEXT NOT NULL,
    actor_id   INTEGER REFERENCES users(id) ON DELETE SET NULL,
    thread_id  INTEGER REFERENCES threads(id) ON DELETE CASCADE,
    post_id    INTEGER REFERENCES posts(id) ON DELETE CASCADE,
    message    TEXT NOT NULL,
    is_read    INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_notifications_user ON notifications(user_id, is_read, created_at);
"#,
    // v5: Bans, reports and moderation log
    r#"
CREATE TABLE bans (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    community_id INTEGER REFERENCES communities(id) ON DELETE CASCADE,
    reason       TEXT NOT NULL,
    banned_by    INTEGER REFERENCES users(id) ON DELETE SET NULL,
    expires_at   TEXT,
    lifted_at    TEXT,
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_bans_user_id ON bans(user_id);
CREATE INDEX idx_bans_community_id ON bans(community_id);

CREATE TABLE reports (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    reporter_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    reason      TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'open',
    handled_by  INTEGER REFERENCES users(id) ON DELETE SET NULL,
    handled_at  TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_reports_post_id ON reports(post_id);
CREATE INDEX idx_reports_status ON reports(status);

CREATE TABLE moderation_log (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    community_id INTEGER REFERENCES communities(id) ON DELETE CASCADE,
    moderator_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    action       TEXT NOT NULL,
    target_type  TEXT NOT NULL,
    target_id    INTEGER NOT NULL,
    details      TEXT,
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_moderation_log_community ON moderation_log(community_id, created_at);
"#,
    // v6: Post attachments
    r#"
CREATE TABLE attachments (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id        INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    uploader_id    INTEGER NOT NULL REFERENCES users(id),
    original_name  TEXT NOT NULL,
    stored_name    TEXT NOT NULL UNIQUE,
    mime_type      TEXT NOT NULL,
    size           INTEGER NOT NULL,
    download_count INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_attachments_post_id ON attachments(post_id);
"#,
    // v7: Full-text search index over posts, kept in sync by triggers
    r#"
CREATE VIRTUAL TABLE posts_fts USING fts5(title, body, tokenize = 'unicode61');

CREATE TRIGGER posts_fts_after_insert AFTER INSERT ON posts
WHEN new.is_deleted = 0
BEGIN
    INSERT INTO posts_fts (rowid, title, body)
    SELECT new.id, t.title, new.body_raw FROM threads t WHERE t.id = new.thread_id;
END;

CREATE TRIGGER posts_fts_after_update AFTER UPDATE OF body_raw, is_deleted ON posts
BEGIN
    DELETE FROM posts_fts WHERE rowid = old.id;
    INSERT INTO posts_fts (rowid, title, body)
    SELECT new.id, t.title, new.body_raw FROM threads t
    WHERE t.id = new.thread_id AND new.is_deleted = 0;
END;

CREATE TRIGGER posts_fts_after_delete AFTER DELETE ON posts
BEGIN
    DELETE FROM posts_fts WHERE rowid = old.id;
END;

CREATE TRIGGER threads_fts_after_title_update AFTER UPDATE OF title ON threads
BEGIN
    UPDATE posts_fts SET title = new.title
    WHERE rowid IN (SELECT id FROM posts WHERE thread_id = new.id);
END;
"#,
    // v8: At most one open report per reporter and post
    r#"
CREATE UNIQUE INDEX idx_reports_one_open
    ON reports(post_id, reporter_id) WHERE status = 'open';
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_first_migration_contains_users_and_sessions() {
        let first = MIGRATIONS[0];
        assert!(first.contains("CREATE TABLE users"));
        assert!(first.contains("CREATE TABLE sessions"));
        assert!(first.contains("token_hash"));
    }

    #[test]
    fn test_migrations_are_valid_sql() {
        for migration in MIGRATIONS {
            assert!(!migration.trim().is_empty());
            assert!(
                migration.contains("CREATE TABLE")
                    || migration.contains("CREATE VIRTUAL TABLE")
                    || migration.contains("CREATE UNIQUE INDEX")
                    || migration.contains("ALTER TABLE")
            );
        }
    }

    #[test]
    fn test_boards_are_unique_per_community() {
        assert!(MIGRATIONS[1].contains("UNIQUE(community_id, slug)"));
    }

    #[test]
    fn test_search_migration_defines_triggers() {
        let fts = MIGRATIONS[6];
        assert!(fts.contains("USING fts5"));
        assert!(fts.contains("posts_fts_after_insert"));
        assert!(fts.contains("posts_fts_after_update"));
        assert!(fts.contains("posts_fts_after_delete"));
    }

    #[test]
    fn test_open_reports_are_unique() {
        let v8 = MIGRATIONS[7];
        assert!(v8.contains("ON reports(post_id, reporter_id) WHERE status = 'open'"));
    }
}
