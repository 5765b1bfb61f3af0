//! End-to-end flows against a live PostgreSQL database. Run them with
//! `cargo test -- --ignored` and a reachable DATABASE_URL; the sqlx test
//! harness creates a throwaway schema per test.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use revue_core::confirmation;
use revue_server::infra::app_state::AppState;

#[path = "support/mod.rs"]
mod support;

use support::{bearer, build_server, build_state};

/// Runs the signup + exchange flow for a fresh account and returns its
/// bearer token. The confirmation code is derived the same way the server
/// derives it, from the stored account state.
async fn register(server: &TestServer, state: &AppState, username: &str, email: &str) -> String {
    let signup = server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": username, "email": email }))
        .await;
    signup.assert_status_ok();

    let user = state
        .users
        .get_by_username(username)
        .await
        .expect("lookup user")
        .expect("user exists after signup");
    let code = confirmation::issue_code(state.code_secret(), &user);

    let exchange = server
        .post("/api/v1/auth/token")
        .json(&json!({ "username": username, "confirmation_code": code }))
        .await;
    exchange.assert_status_ok();

    let body: Value = exchange.json();
    body["token"].as_str().expect("token in response").to_string()
}

async fn set_role(pool: &PgPool, username: &str, role: &str) {
    sqlx::query("UPDATE users SET role = $2 WHERE username = $1")
        .bind(username)
        .bind(role)
        .execute(pool)
        .await
        .expect("set role");
}

async fn create_title(server: &TestServer, admin_token: &str, name: &str) -> Uuid {
    let response = server
        .post("/api/v1/titles")
        .add_header("Authorization", bearer(admin_token))
        .json(&json!({ "name": name, "year": 1999 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("title id")
}

#[sqlx::test(migrator = "revue_server::MIGRATOR")]
#[ignore = "requires a PostgreSQL server"]
async fn signup_and_token_exchange(pool: PgPool) {
    let state = build_state(pool);
    let server = build_server(state.clone());

    let signup = server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": "reader", "email": "reader@example.com" }))
        .await;
    signup.assert_status_ok();
    let body: Value = signup.json();
    assert_eq!(body["username"], "reader");
    assert_eq!(body["email"], "reader@example.com");

    // Re-posting the identical pair resends the code instead of conflicting.
    let resend = server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": "reader", "email": "reader@example.com" }))
        .await;
    resend.assert_status_ok();

    // Same username with another email is taken.
    let taken = server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": "reader", "email": "other@example.com" }))
        .await;
    taken.assert_status(StatusCode::BAD_REQUEST);
    let taken_body: Value = taken.json();
    assert!(taken_body["errors"]["username"].is_array());

    let user = state
        .users
        .get_by_username("reader")
        .await
        .expect("lookup")
        .expect("exists");
    assert!(!user.is_confirmed());
    let code = confirmation::issue_code(state.code_secret(), &user);

    let wrong = server
        .post("/api/v1/auth/token")
        .json(&json!({ "username": "reader", "confirmation_code": "bogus" }))
        .await;
    wrong.assert_status(StatusCode::BAD_REQUEST);

    let exchange = server
        .post("/api/v1/auth/token")
        .json(&json!({ "username": "reader", "confirmation_code": code }))
        .await;
    exchange.assert_status_ok();
    let token = exchange.json::<Value>()["token"]
        .as_str()
        .expect("token")
        .to_string();

    // The exchange bumped the code epoch, so the code is single-use.
    let replay = server
        .post("/api/v1/auth/token")
        .json(&json!({ "username": "reader", "confirmation_code": code }))
        .await;
    replay.assert_status(StatusCode::BAD_REQUEST);

    let me = server
        .get("/api/v1/users/me")
        .add_header("Authorization", bearer(&token))
        .await;
    me.assert_status_ok();
    let me_body: Value = me.json();
    assert_eq!(me_body["username"], "reader");
    assert_eq!(me_body["role"], "user");
    assert!(me_body["confirmed_at"].is_string());
    assert!(me_body.get("code_epoch").is_none());
}

#[sqlx::test(migrator = "revue_server::MIGRATOR")]
#[ignore = "requires a PostgreSQL server"]
async fn admin_manages_the_catalog(pool: PgPool) {
    let state = build_state(pool.clone());
    let server = build_server(state.clone());

    let plain_token = register(&server, &state, "plain", "plain@example.com").await;
    server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": "boss", "email": "boss@example.com" }))
        .await
        .assert_status_ok();
    set_role(&pool, "boss", "admin").await;
    let boss = state
        .users
        .get_by_username("boss")
        .await
        .expect("lookup")
        .expect("exists");
    let code = confirmation::issue_code(state.code_secret(), &boss);
    let admin_token = server
        .post("/api/v1/auth/token")
        .json(&json!({ "username": "boss", "confirmation_code": code }))
        .await
        .json::<Value>()["token"]
        .as_str()
        .expect("token")
        .to_string();

    // Catalog writes are admin-only.
    let forbidden = server
        .post("/api/v1/categories")
        .add_header("Authorization", bearer(&plain_token))
        .json(&json!({ "name": "Films", "slug": "films" }))
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);

    let created = server
        .post("/api/v1/categories")
        .add_header("Authorization", bearer(&admin_token))
        .json(&json!({ "name": "Films", "slug": "films" }))
        .await;
    created.assert_status(StatusCode::CREATED);

    let duplicate = server
        .post("/api/v1/categories")
        .add_header("Authorization", bearer(&admin_token))
        .json(&json!({ "name": "Movies", "slug": "films" }))
        .await;
    duplicate.assert_status(StatusCode::BAD_REQUEST);
    let dup_body: Value = duplicate.json();
    assert!(dup_body["errors"]["slug"].is_array());

    server
        .post("/api/v1/genres")
        .add_header("Authorization", bearer(&admin_token))
        .json(&json!({ "name": "Drama", "slug": "drama" }))
        .await
        .assert_status(StatusCode::CREATED);

    let title = server
        .post("/api/v1/titles")
        .add_header("Authorization", bearer(&admin_token))
        .json(&json!({
            "name": "Magnolia",
            "year": 1999,
            "category": "films",
            "genre": ["drama"]
        }))
        .await;
    title.assert_status(StatusCode::CREATED);
    let title_body: Value = title.json();
    let title_id = title_body["id"].as_str().expect("id").to_string();
    assert_eq!(title_body["category"]["slug"], "films");
    assert_eq!(title_body["genre"][0]["slug"], "drama");
    assert!(title_body["rating"].is_null());

    let unknown_slug = server
        .post("/api/v1/titles")
        .add_header("Authorization", bearer(&admin_token))
        .json(&json!({ "name": "X", "category": "missing" }))
        .await;
    unknown_slug.assert_status(StatusCode::BAD_REQUEST);

    let filtered = server.get("/api/v1/titles?category=films").await;
    filtered.assert_status_ok();
    let filtered_body: Value = filtered.json();
    assert_eq!(filtered_body["count"], 1);

    let empty = server.get("/api/v1/titles?genre=missing").await;
    empty.assert_status_ok();
    assert_eq!(empty.json::<Value>()["count"], 0);

    // Deleting the category unlinks it from the title instead of deleting
    // the title.
    server
        .delete("/api/v1/categories/films")
        .add_header("Authorization", bearer(&admin_token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let after = server.get(&format!("/api/v1/titles/{title_id}")).await;
    after.assert_status_ok();
    assert!(after.json::<Value>()["category"].is_null());

    server
        .delete(&format!("/api/v1/titles/{title_id}"))
        .add_header("Authorization", bearer(&admin_token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get(&format!("/api/v1/titles/{title_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[sqlx::test(migrator = "revue_server::MIGRATOR")]
#[ignore = "requires a PostgreSQL server"]
async fn review_lifecycle_and_ownership(pool: PgPool) {
    let state = build_state(pool.clone());
    let server = build_server(state.clone());

    server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": "boss", "email": "boss@example.com" }))
        .await
        .assert_status_ok();
    set_role(&pool, "boss", "admin").await;
    let admin_token = {
        let boss = state
            .users
            .get_by_username("boss")
            .await
            .expect("lookup")
            .expect("exists");
        let code = confirmation::issue_code(state.code_secret(), &boss);
        server
            .post("/api/v1/auth/token")
            .json(&json!({ "username": "boss", "confirmation_code": code }))
            .await
            .json::<Value>()["token"]
            .as_str()
            .expect("token")
            .to_string()
    };

    let alice_token = register(&server, &state, "alice", "alice@example.com").await;
    let bob_token = register(&server, &state, "bob", "bob@example.com").await;
    let mod_token = {
        let token = register(&server, &state, "mona", "mona@example.com").await;
        set_role(&pool, "mona", "moderator").await;
        token
    };

    let title_id = create_title(&server, &admin_token, "Magnolia").await;
    let reviews_path = format!("/api/v1/titles/{title_id}/reviews");

    let review = server
        .post(&reviews_path)
        .add_header("Authorization", bearer(&alice_token))
        .json(&json!({ "text": "stunning", "score": 8 }))
        .await;
    review.assert_status(StatusCode::CREATED);
    let review_body: Value = review.json();
    let review_id = review_body["id"].as_str().expect("id").to_string();
    assert_eq!(review_body["author"], "alice");
    assert!(review_body.get("author_id").is_none());

    // One review per (author, title).
    let second = server
        .post(&reviews_path)
        .add_header("Authorization", bearer(&alice_token))
        .json(&json!({ "text": "again", "score": 3 }))
        .await;
    second.assert_status(StatusCode::BAD_REQUEST);

    let out_of_range = server
        .post(&reviews_path)
        .add_header("Authorization", bearer(&bob_token))
        .json(&json!({ "text": "meh", "score": 11 }))
        .await;
    out_of_range.assert_status(StatusCode::BAD_REQUEST);

    server
        .post(&reviews_path)
        .add_header("Authorization", bearer(&bob_token))
        .json(&json!({ "text": "fine", "score": 5 }))
        .await
        .assert_status(StatusCode::CREATED);

    // Rating is the floor of the mean score: (8 + 5) / 2 → 6.
    let title = server.get(&format!("/api/v1/titles/{title_id}")).await;
    assert_eq!(title.json::<Value>()["rating"], 6);

    // Anyone may read.
    let listing = server.get(&reviews_path).await;
    listing.assert_status_ok();
    assert_eq!(listing.json::<Value>()["count"], 2);

    // A review fetched through the wrong title is not found.
    let other_title = create_title(&server, &admin_token, "Decoy").await;
    server
        .get(&format!("/api/v1/titles/{other_title}/reviews/{review_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let review_path = format!("{reviews_path}/{review_id}");

    // Editing is owner-only, for moderators and admins too.
    server
        .patch(&review_path)
        .add_header("Authorization", bearer(&bob_token))
        .json(&json!({ "score": 1 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .patch(&review_path)
        .add_header("Authorization", bearer(&admin_token))
        .json(&json!({ "score": 1 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    let edited = server
        .patch(&review_path)
        .add_header("Authorization", bearer(&alice_token))
        .json(&json!({ "score": 9 }))
        .await;
    edited.assert_status_ok();
    assert_eq!(edited.json::<Value>()["score"], 9);

    // Comments hang off the review.
    let comments_path = format!("{review_path}/comments");
    let comment = server
        .post(&comments_path)
        .add_header("Authorization", bearer(&bob_token))
        .json(&json!({ "text": "agreed" }))
        .await;
    comment.assert_status(StatusCode::CREATED);
    let comment_id = comment.json::<Value>()["id"]
        .as_str()
        .expect("id")
        .to_string();

    server
        .patch(&format!("{comments_path}/{comment_id}"))
        .add_header("Authorization", bearer(&alice_token))
        .json(&json!({ "text": "hijacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Deletion extends to moderator tier.
    server
        .delete(&format!("{comments_path}/{comment_id}"))
        .add_header("Authorization", bearer(&mod_token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete(&review_path)
        .add_header("Authorization", bearer(&mod_token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get(&review_path)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[sqlx::test(migrator = "revue_server::MIGRATOR")]
#[ignore = "requires a PostgreSQL server"]
async fn deleting_a_title_cascades_to_reviews_and_comments(pool: PgPool) {
    let state = build_state(pool.clone());
    let server = build_server(state.clone());

    server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": "boss", "email": "boss@example.com" }))
        .await
        .assert_status_ok();
    set_role(&pool, "boss", "admin").await;
    let boss = state
        .users
        .get_by_username("boss")
        .await
        .expect("lookup")
        .expect("exists");
    let code = confirmation::issue_code(state.code_secret(), &boss);
    let admin_token = server
        .post("/api/v1/auth/token")
        .json(&json!({ "username": "boss", "confirmation_code": code }))
        .await
        .json::<Value>()["token"]
        .as_str()
        .expect("token")
        .to_string();
    let alice_token = register(&server, &state, "alice", "alice@example.com").await;

    let title_id = create_title(&server, &admin_token, "Ephemeral").await;
    let reviews_path = format!("/api/v1/titles/{title_id}/reviews");

    let review = server
        .post(&reviews_path)
        .add_header("Authorization", bearer(&alice_token))
        .json(&json!({ "text": "short-lived", "score": 4 }))
        .await;
    review.assert_status(StatusCode::CREATED);
    let review_id = review.json::<Value>()["id"]
        .as_str()
        .expect("id")
        .to_string();

    let comment = server
        .post(&format!("{reviews_path}/{review_id}/comments"))
        .add_header("Authorization", bearer(&admin_token))
        .json(&json!({ "text": "noted" }))
        .await;
    comment.assert_status(StatusCode::CREATED);
    let comment_id = comment.json::<Value>()["id"]
        .as_str()
        .expect("id")
        .to_string();

    server
        .delete(&format!("/api/v1/titles/{title_id}"))
        .add_header("Authorization", bearer(&admin_token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Nothing under the deleted title resolves anymore.
    server
        .get(&reviews_path)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("{reviews_path}/{review_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("{reviews_path}/{review_id}/comments/{comment_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // The rows themselves are gone, not just hidden behind the 404 chain.
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
        .bind(title_id)
        .fetch_one(&pool)
        .await
        .expect("count reviews");
    assert_eq!(remaining, 0);
    let orphaned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
        .bind(Uuid::parse_str(&review_id).expect("review id"))
        .fetch_one(&pool)
        .await
        .expect("count comments");
    assert_eq!(orphaned, 0);
}

#[sqlx::test(migrator = "revue_server::MIGRATOR")]
#[ignore = "requires a PostgreSQL server"]
async fn admin_user_management(pool: PgPool) {
    let state = build_state(pool.clone());
    let server = build_server(state.clone());

    let plain_token = register(&server, &state, "plain", "plain@example.com").await;
    server
        .post("/api/v1/auth/signup")
        .json(&json!({ "username": "boss", "email": "boss@example.com" }))
        .await
        .assert_status_ok();
    set_role(&pool, "boss", "admin").await;
    let boss = state
        .users
        .get_by_username("boss")
        .await
        .expect("lookup")
        .expect("exists");
    let code = confirmation::issue_code(state.code_secret(), &boss);
    let admin_token = server
        .post("/api/v1/auth/token")
        .json(&json!({ "username": "boss", "confirmation_code": code }))
        .await
        .json::<Value>()["token"]
        .as_str()
        .expect("token")
        .to_string();

    // The management surface is admin-only.
    server
        .get("/api/v1/users")
        .add_header("Authorization", bearer(&plain_token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let created = server
        .post("/api/v1/users")
        .add_header("Authorization", bearer(&admin_token))
        .json(&json!({
            "username": "managed",
            "email": "managed@example.com",
            "role": "moderator"
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    assert_eq!(created.json::<Value>()["role"], "moderator");

    let listing = server
        .get("/api/v1/users?search=managed")
        .add_header("Authorization", bearer(&admin_token))
        .await;
    listing.assert_status_ok();
    assert_eq!(listing.json::<Value>()["count"], 1);

    let patched = server
        .patch("/api/v1/users/managed")
        .add_header("Authorization", bearer(&admin_token))
        .json(&json!({ "role": "admin", "bio": "promoted" }))
        .await;
    patched.assert_status_ok();
    assert_eq!(patched.json::<Value>()["role"], "admin");

    // Self-edit cannot change the role.
    let self_patch = server
        .patch("/api/v1/users/me")
        .add_header("Authorization", bearer(&plain_token))
        .json(&json!({ "role": "admin", "bio": "just a bio" }))
        .await;
    self_patch.assert_status_ok();
    let self_body: Value = self_patch.json();
    assert_eq!(self_body["role"], "user");
    assert_eq!(self_body["bio"], "just a bio");

    server
        .delete("/api/v1/users/managed")
        .add_header("Authorization", bearer(&admin_token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get("/api/v1/users/managed")
        .add_header("Authorization", bearer(&admin_token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
