//! Shared helpers for API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use agora::attachment::FileStorage;
use agora::web::{create_router, AppState};
use agora::{Config, Database};
use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const PASSWORD: &str = "password123";

/// A running API with its state and attachment directory.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    _dir: TempDir,
}

/// Configuration with limits high enough not to interfere with tests.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.web.login_rate_limit = 1000;
    config.web.api_rate_limit = 10_000;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let storage = FileStorage::new(dir.path()).expect("storage");
    let state = Arc::new(AppState::with_storage(db, config, storage));
    let server = TestServer::new(create_router(state.clone())).expect("Failed to create test server");
    TestApp {
        server,
        state,
        _dir: dir,
    }
}

/// Attach a bearer token to a request.
pub fn authed(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("header value"),
    )
}

/// Register `username` and return the created user.
pub async fn register(server: &TestServer, username: &str) -> Value {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "password": PASSWORD,
            "display_name": username.to_uppercase(),
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

/// Log `username` in and return the session token.
pub async fn login(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": username, "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["token"]
        .as_str()
        .expect("token")
        .to_string()
}

/// Register and log in; returns (user id, token).
pub async fn signup(server: &TestServer, username: &str) -> (i64, String) {
    let user = register(server, username).await;
    let token = login(server, username).await;
    (user["id"].as_i64().expect("user id"), token)
}

/// A community `rust` with one category and one public board.
pub struct Forum {
    pub slug: String,
    pub category_id: i64,
    pub board_id: i64,
}

pub async fn create_forum(server: &TestServer, admin_token: &str) -> Forum {
    authed(server.post("/api/communities"), admin_token)
        .json(&json!({ "slug": "rust", "name": "Rust", "description": "All things Rust" }))
        .await
        .assert_status(StatusCode::CREATED);

    let category = authed(server.post("/api/communities/rust/categories"), admin_token)
        .json(&json!({ "name": "General" }))
        .await;
    category.assert_status(StatusCode::CREATED);
    let category_id = category.json::<Value>()["data"]["id"].as_i64().expect("id");

    let board = authed(server.post("/api/communities/rust/boards"), admin_token)
        .json(&json!({ "category_id": category_id, "slug": "help", "name": "Help" }))
        .await;
    board.assert_status(StatusCode::CREATED);
    let board_id = board.json::<Value>()["data"]["id"].as_i64().expect("id");

    Forum {
        slug: "rust".to_string(),
        category_id,
        board_id,
    }
}

/// Start a thread; returns (thread id, first post id).
pub async fn create_thread(
    server: &TestServer,
    token: &str,
    board_id: i64,
    title: &str,
    body: &str,
) -> (i64, i64) {
    let response = authed(server.post(&format!("/api/boards/{board_id}/threads")), token)
        .json(&json!({ "title": title, "body": body }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let data = response.json::<Value>()["data"].clone();
    (
        data["thread"]["id"].as_i64().expect("thread id"),
        data["post"]["id"].as_i64().expect("post id"),
    )
}

/// Reply to a thread; returns the post id.
pub async fn reply(server: &TestServer, token: &str, thread_id: i64, body: &str) -> i64 {
    let response = authed(server.post(&format!("/api/threads/{thread_id}/posts")), token)
        .json(&json!({ "body": body }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"]["id"].as_i64().expect("post id")
}
