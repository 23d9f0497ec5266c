//! Community, board, thread and post API tests.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{authed, create_forum, create_thread, reply, signup, spawn_app};

// ============================================================================
// Communities and boards
// ============================================================================

#[tokio::test]
async fn test_community_overview() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let forum = create_forum(&app.server, &admin).await;

    let listing = app.server.get("/api/communities").await;
    listing.assert_status_ok();
    let body: Value = listing.json();
    assert_eq!(body["data"][0]["slug"], "rust");

    let overview = app.server.get(&format!("/api/communities/{}", forum.slug)).await;
    overview.assert_status_ok();
    let body: Value = overview.json();
    assert_eq!(body["data"]["name"], "Rust");
    assert_eq!(body["data"]["access"]["role"], "guest");
    assert_eq!(body["data"]["categories"][0]["name"], "General");
    assert_eq!(body["data"]["categories"][0]["boards"][0]["slug"], "help");

    app.server
        .get("/api/communities/missing")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_admin_creates_communities() {
    let app = spawn_app().await;
    signup(&app.server, "siteop").await;
    let (_, member) = signup(&app.server, "member").await;

    authed(app.server.post("/api/communities"), &member)
        .json(&json!({ "slug": "golang", "name": "Go" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post("/api/communities")
        .json(&json!({ "slug": "golang", "name": "Go" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_and_invalid_slugs() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    create_forum(&app.server, &admin).await;

    authed(app.server.post("/api/communities"), &admin)
        .json(&json!({ "slug": "rust", "name": "Rust again" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    authed(app.server.post("/api/communities"), &admin)
        .json(&json!({ "slug": "Not A Slug", "name": "Bad" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_members_only_board() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let (_, member) = signup(&app.server, "member").await;
    let forum = create_forum(&app.server, &admin).await;

    let board = authed(app.server.post("/api/communities/rust/boards"), &admin)
        .json(&json!({
            "category_id": forum.category_id,
            "slug": "lounge",
            "name": "Lounge",
            "min_read_role": "member",
        }))
        .await;
    board.assert_status(StatusCode::CREATED);
    let lounge = board.json::<Value>()["data"]["id"].as_i64().unwrap();

    app.server
        .get(&format!("/api/boards/{lounge}"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    authed(app.server.get(&format!("/api/boards/{lounge}")), &member)
        .await
        .assert_status_ok();

    // Guests only see the public board.
    let overview: Value = app.server.get("/api/communities/rust").await.json();
    let boards = overview["data"]["categories"][0]["boards"].as_array().unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0]["slug"], "help");
}

#[tokio::test]
async fn test_update_board_settings() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let (_, member) = signup(&app.server, "member").await;
    let forum = create_forum(&app.server, &admin).await;

    let response = authed(app.server.put(&format!("/api/boards/{}", forum.board_id)), &admin)
        .json(&json!({ "name": "Questions", "min_write_role": "moderator" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "Questions");
    assert_eq!(body["data"]["min_write_role"], "moderator");

    authed(
        app.server.post(&format!("/api/boards/{}/threads", forum.board_id)),
        &member,
    )
    .json(&json!({ "title": "Hello", "body": "Anyone here?" }))
    .await
    .assert_status(StatusCode::FORBIDDEN);

    authed(app.server.put(&format!("/api/boards/{}", forum.board_id)), &admin)
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Threads and posts
// ============================================================================

#[tokio::test]
async fn test_thread_and_replies() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let (_, alice) = signup(&app.server, "alice").await;
    let (_, bob) = signup(&app.server, "bob").await;
    let forum = create_forum(&app.server, &admin).await;

    let (thread_id, _) =
        create_thread(&app.server, &alice, forum.board_id, "First steps", "[b]Hello[/b] world").await;
    reply(&app.server, &bob, thread_id, "Welcome!").await;

    let thread: Value = app.server.get(&format!("/api/threads/{thread_id}")).await.json();
    assert_eq!(thread["data"]["thread"]["title"], "First steps");
    assert_eq!(thread["data"]["thread"]["post_count"], 2);
    assert_eq!(thread["data"]["thread"]["author"]["username"], "alice");
    assert_eq!(thread["data"]["can_reply"], false);

    let posts = app.server.get(&format!("/api/threads/{thread_id}/posts")).await;
    posts.assert_status_ok();
    let body: Value = posts.json();
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["data"][0]["body"], "[b]Hello[/b] world");
    assert!(body["data"][0]["body_html"]
        .as_str()
        .unwrap()
        .contains("<strong>Hello</strong>"));
    assert_eq!(body["data"][1]["author"]["username"], "bob");

    let threads: Value = app
        .server
        .get(&format!("/api/boards/{}/threads", forum.board_id))
        .await
        .json();
    assert_eq!(threads["meta"]["total"], 1);
    assert_eq!(threads["data"][0]["id"], thread_id);

    let board: Value = app
        .server
        .get(&format!("/api/boards/{}", forum.board_id))
        .await
        .json();
    assert_eq!(board["data"]["thread_count"], 1);
    assert_eq!(board["data"]["post_count"], 2);
}

#[tokio::test]
async fn test_guest_cannot_post() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let forum = create_forum(&app.server, &admin).await;

    app.server
        .post(&format!("/api/boards/{}/threads", forum.board_id))
        .json(&json!({ "title": "Hi", "body": "Drive-by" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blank_title_rejected() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let forum = create_forum(&app.server, &admin).await;

    authed(
        app.server.post(&format!("/api/boards/{}/threads", forum.board_id)),
        &admin,
    )
    .json(&json!({ "title": "   ", "body": "Body" }))
    .await
    .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_edit_and_delete_posts() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let (_, alice) = signup(&app.server, "alice").await;
    let (_, bob) = signup(&app.server, "bob").await;
    let forum = create_forum(&app.server, &admin).await;

    let (thread_id, _) = create_thread(&app.server, &alice, forum.board_id, "Topic", "Opening").await;
    let post_id = reply(&app.server, &alice, thread_id, "Tpyo").await;

    // Someone else's post.
    authed(app.server.put(&format!("/api/posts/{post_id}")), &bob)
        .json(&json!({ "body": "Vandalised" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let edited = authed(app.server.put(&format!("/api/posts/{post_id}")), &alice)
        .json(&json!({ "body": "Typo" }))
        .await;
    edited.assert_status_ok();
    let body: Value = edited.json();
    assert_eq!(body["data"]["body"], "Typo");
    assert!(body["data"]["edited_at"].is_string());

    authed(app.server.delete(&format!("/api/posts/{post_id}")), &bob)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    authed(app.server.delete(&format!("/api/posts/{post_id}")), &alice)
        .await
        .assert_status_ok();

    let post: Value = app.server.get(&format!("/api/posts/{post_id}")).await.json();
    assert_eq!(post["data"]["is_deleted"], true);
}

#[tokio::test]
async fn test_locking_blocks_replies() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let (_, alice) = signup(&app.server, "alice").await;
    let forum = create_forum(&app.server, &admin).await;
    let (thread_id, _) = create_thread(&app.server, &alice, forum.board_id, "Topic", "Opening").await;

    authed(app.server.post(&format!("/api/threads/{thread_id}/lock")), &alice)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let locked = authed(app.server.post(&format!("/api/threads/{thread_id}/lock")), &admin).await;
    locked.assert_status_ok();
    assert_eq!(locked.json::<Value>()["data"]["is_locked"], true);

    authed(app.server.post(&format!("/api/threads/{thread_id}/posts")), &alice)
        .json(&json!({ "body": "Let me in" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let detail: Value = authed(app.server.get(&format!("/api/threads/{thread_id}")), &alice)
        .await
        .json();
    assert_eq!(detail["data"]["can_reply"], false);

    // Moderators may still reply.
    reply(&app.server, &admin, thread_id, "Closing note").await;

    authed(app.server.post(&format!("/api/threads/{thread_id}/unlock")), &admin)
        .await
        .assert_status_ok();
    reply(&app.server, &alice, thread_id, "Thanks").await;
}

#[tokio::test]
async fn test_sticky_threads_first() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let forum = create_forum(&app.server, &admin).await;

    let (rules, _) = create_thread(&app.server, &admin, forum.board_id, "Rules", "Be nice").await;
    let (latest, _) = create_thread(&app.server, &admin, forum.board_id, "Latest", "News").await;

    let threads: Value = app
        .server
        .get(&format!("/api/boards/{}/threads", forum.board_id))
        .await
        .json();
    assert_eq!(threads["data"][0]["id"], latest);

    authed(app.server.post(&format!("/api/threads/{rules}/sticky")), &admin)
        .await
        .assert_status_ok();

    let threads: Value = app
        .server
        .get(&format!("/api/boards/{}/threads", forum.board_id))
        .await
        .json();
    assert_eq!(threads["data"][0]["id"], rules);
    assert_eq!(threads["data"][0]["is_sticky"], true);
}

#[tokio::test]
async fn test_move_and_delete_thread() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let forum = create_forum(&app.server, &admin).await;

    let other = authed(app.server.post("/api/communities/rust/boards"), &admin)
        .json(&json!({ "category_id": forum.category_id, "slug": "offtopic", "name": "Off topic" }))
        .await;
    other.assert_status(StatusCode::CREATED);
    let other_id = other.json::<Value>()["data"]["id"].as_i64().unwrap();

    let (thread_id, _) = create_thread(&app.server, &admin, forum.board_id, "Wrong place", "Oops").await;

    let moved = authed(app.server.post(&format!("/api/threads/{thread_id}/move")), &admin)
        .json(&json!({ "board_id": other_id }))
        .await;
    moved.assert_status_ok();
    assert_eq!(moved.json::<Value>()["data"]["board_id"], other_id);

    authed(app.server.delete(&format!("/api/threads/{thread_id}")), &admin)
        .await
        .assert_status_ok();
    app.server
        .get(&format!("/api/threads/{thread_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pagination_meta() {
    let app = spawn_app().await;
    let (_, admin) = signup(&app.server, "siteop").await;
    let forum = create_forum(&app.server, &admin).await;
    let (thread_id, _) = create_thread(&app.server, &admin, forum.board_id, "Long", "Post 0").await;
    for i in 1..5 {
        reply(&app.server, &admin, thread_id, &format!("Post {i}")).await;
    }

    let page: Value = app
        .server
        .get(&format!("/api/threads/{thread_id}/posts"))
        .add_query_param("page", 2)
        .add_query_param("per_page", 2)
        .await
        .json();
    assert_eq!(page["meta"]["page"], 2);
    assert_eq!(page["meta"]["per_page"], 2);
    assert_eq!(page["meta"]["total"], 5);
    assert_eq!(page["data"][0]["body"], "Post 2");
}

#[tokio::test]
async fn test_bbcode_preview() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/bbcode/preview")
        .json(&json!({ "body": "[i]hi[/i] <script>" }))
        .await;
    response.assert_status_ok();
    let html = response.json::<Value>()["data"]["html"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(html.contains("<em>hi</em>"));
    assert!(!html.contains("<script>"));

    // A full-length body of nested tags renders.
    let n = 20_000 / "[b][/b]".len();
    let nested = format!("{}x{}", "[b]".repeat(n), "[/b]".repeat(n));
    app.server
        .post("/api/bbcode/preview")
        .json(&json!({ "body": nested }))
        .await
        .assert_status_ok();

    app.server
        .post("/api/bbcode/preview")
        .json(&json!({ "body": "x".repeat(20_001) }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}
