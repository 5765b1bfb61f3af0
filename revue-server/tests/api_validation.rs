//! Request validation and authentication gating. These tests exercise the
//! paths that reject a request before storage is involved, so they run
//! against a pool that never connects.

use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

#[path = "support/mod.rs"]
mod support;

use support::{bearer, build_server, build_state, lazy_pool};

#[tokio::test]
async fn signup_rejects_missing_fields_per_field() {
    let server = build_server(build_state(lazy_pool()));

    let response = server.post("/api/v1/auth/signup").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["errors"]["username"].is_array());
    assert!(body["errors"]["email"].is_array());
}

#[tokio::test]
async fn signup_rejects_the_reserved_username() {
    let server = build_server(build_state(lazy_pool()));

    let response = server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": "me", "email": "me@example.com" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["errors"]["username"].is_array());
}

#[tokio::test]
async fn signup_rejects_malformed_username_and_email() {
    let server = build_server(build_state(lazy_pool()));

    let response = server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": "has spaces", "email": "not-an-email" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["errors"]["username"].is_array());
    assert!(body["errors"]["email"].is_array());
}

#[tokio::test]
async fn token_requires_username_and_code() {
    let server = build_server(build_state(lazy_pool()));

    let response = server
        .post("/api/v1/auth/token")
        .json(&json!({ "username": "someone" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["errors"]["confirmation_code"].is_array());
}

#[tokio::test]
async fn me_requires_authentication() {
    let server = build_server(build_state(lazy_pool()));

    let get = server.get("/api/v1/users/me").await;
    get.assert_status(StatusCode::UNAUTHORIZED);

    let patch = server
        .patch("/api/v1/users/me")
        .json(&json!({ "bio": "hi" }))
        .await;
    patch.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_bearer_token_is_unauthorized() {
    let server = build_server(build_state(lazy_pool()));

    let response = server
        .get("/api/v1/users/me")
        .add_header("Authorization", bearer("not-a-jwt"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_writes_require_authentication() {
    let server = build_server(build_state(lazy_pool()));

    let create_category = server
        .post("/api/v1/categories")
        .json(&json!({ "name": "Films", "slug": "films" }))
        .await;
    create_category.assert_status(StatusCode::UNAUTHORIZED);

    let delete_genre = server.delete("/api/v1/genres/rock").await;
    delete_genre.assert_status(StatusCode::UNAUTHORIZED);

    let create_title = server
        .post("/api/v1/titles")
        .json(&json!({ "name": "Dune", "year": 2021 }))
        .await;
    create_title.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn review_and_comment_writes_require_authentication() {
    let server = build_server(build_state(lazy_pool()));
    let title_id = Uuid::new_v4();
    let review_id = Uuid::new_v4();

    let create_review = server
        .post(&format!("/api/v1/titles/{title_id}/reviews"))
        .json(&json!({ "text": "great", "score": 9 }))
        .await;
    create_review.assert_status(StatusCode::UNAUTHORIZED);

    let create_comment = server
        .post(&format!(
            "/api/v1/titles/{title_id}/reviews/{review_id}/comments"
        ))
        .json(&json!({ "text": "agreed" }))
        .await;
    create_comment.assert_status(StatusCode::UNAUTHORIZED);
}
