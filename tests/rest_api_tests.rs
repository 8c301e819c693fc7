//! End-to-end HTTP tests over the in-memory backend.

use axum_test::TestServer;
use chrono::Duration;
use serde_json::{Value, json};
use slate::config::CmsConfig;
use slate::core::auth::Claims;
use slate::server::{ServerBuilder, router};
use uuid::Uuid;

const SECRET: &str = "insecure-test-secret";

async fn test_server() -> TestServer {
    let (state, _) = ServerBuilder::new(CmsConfig::default_config())
        .build_state()
        .await
        .unwrap();
    TestServer::new(router(state))
}

fn token_for(role: &str) -> String {
    let keys = slate::core::auth::TokenKeys::new(SECRET.as_bytes());
    let claims = Claims::new(
        Uuid::new_v4(),
        format!("{role}-actor"),
        role.to_string(),
        Duration::hours(1),
    );
    keys.sign(&claims).unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let server = test_server().await;
    let res = server.get("/health").await;
    res.assert_status_ok();
    res.assert_json(&json!({ "status": "ok" }));
}

#[tokio::test]
async fn admin_creates_a_page_with_matching_timestamps() {
    let server = test_server().await;
    let res = server
        .post("/api/pages")
        .authorization_bearer(token_for("admin"))
        .json(&json!({ "page": { "name": "Home", "slug": "home" } }))
        .await;
    res.assert_status_ok();

    let body: Value = res.json();
    assert_eq!(body["name"], "Home");
    assert_eq!(body["slug"], "home");
    assert_eq!(body["enabled"], false);
    assert_eq!(body["content"], json!([]));
    assert_eq!(body["dateAdded"], body["dateUpdated"]);
}

#[tokio::test]
async fn duplicate_slug_is_a_400_with_error_body() {
    let server = test_server().await;
    let token = token_for("admin");
    let page = json!({ "page": { "name": "Home", "slug": "home" } });

    server
        .post("/api/pages")
        .authorization_bearer(&token)
        .json(&page)
        .await
        .assert_status_ok();

    let res = server
        .post("/api/pages")
        .authorization_bearer(&token)
        .json(&page)
        .await;
    res.assert_status_bad_request();
    res.assert_json(&json!({ "error": "A record with this slug already exists" }));
}

#[tokio::test]
async fn anonymous_requests_see_only_enabled_pages() {
    let server = test_server().await;
    let token = token_for("superAdmin");

    server
        .post("/api/pages")
        .authorization_bearer(&token)
        .json(&json!({ "page": { "name": "Live", "slug": "live", "enabled": true } }))
        .await
        .assert_status_ok();
    server
        .post("/api/pages")
        .authorization_bearer(&token)
        .json(&json!({ "page": { "name": "Hidden", "slug": "hidden" } }))
        .await
        .assert_status_ok();

    let listed: Value = server.get("/api/pages").await.json();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["slug"], "live");

    // A disabled page answers like a missing one.
    let res = server.get("/api/pages/hidden").await;
    res.assert_status_not_found();
    res.assert_json(&json!({ "error": "page not found" }));

    // The owner still sees it.
    server
        .get("/api/pages/hidden")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn draft_or_private_blog_posts_are_hidden_from_readers() {
    let server = test_server().await;
    let token = token_for("admin");

    server
        .post("/api/blog-posts")
        .authorization_bearer(&token)
        .json(&json!({ "blogPost": {
            "name": "Announcement", "slug": "announcement",
            "draft": false, "public": true
        } }))
        .await
        .assert_status_ok();
    server
        .post("/api/blog-posts")
        .authorization_bearer(&token)
        .json(&json!({ "blogPost": { "name": "WIP", "slug": "wip" } }))
        .await
        .assert_status_ok();

    let listed: Value = server.get("/api/blog-posts").await.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    server
        .get("/api/blog-posts/wip")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn update_applies_only_supplied_fields() {
    let server = test_server().await;
    let token = token_for("admin");

    let created: Value = server
        .post("/api/pages")
        .authorization_bearer(&token)
        .json(&json!({ "page": { "name": "Home", "slug": "home", "enabled": true } }))
        .await
        .json();

    let res = server
        .post(&format!("/api/pages/{}", created["id"].as_str().unwrap()))
        .authorization_bearer(&token)
        .json(&json!({ "page": { "name": "Homepage" } }))
        .await;
    res.assert_status_ok();

    let updated: Value = res.json();
    assert_eq!(updated["name"], "Homepage");
    assert_eq!(updated["slug"], "home");
    assert_eq!(updated["enabled"], true);
}

#[tokio::test]
async fn strict_boolean_validation_rejects_truthy_strings() {
    let server = test_server().await;
    let res = server
        .post("/api/pages")
        .authorization_bearer(token_for("admin"))
        .json(&json!({ "page": { "name": "Home", "slug": "home", "enabled": "true" } }))
        .await;
    res.assert_status_bad_request();
}

#[tokio::test]
async fn short_password_is_rejected_with_the_exact_message() {
    let server = test_server().await;
    let res = server
        .post("/api/users")
        .authorization_bearer(token_for("admin"))
        .json(&json!({ "newUser": {
            "username": "alice", "email": "alice@example.com", "password": "tiny"
        } }))
        .await;
    res.assert_status_bad_request();

    let body: Value = res.json();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("Password length is too short")
    );
}

#[tokio::test]
async fn user_responses_never_carry_the_digest() {
    let server = test_server().await;
    let token = token_for("admin");

    let created: Value = server
        .post("/api/users")
        .authorization_bearer(&token)
        .json(&json!({ "newUser": {
            "username": "alice", "email": "alice@example.com", "password": "longenough"
        } }))
        .await
        .json();
    assert!(created.get("passwordDigest").is_none());
    assert_eq!(created["role"], "subscriber");
    assert_eq!(created["slug"], "alice");

    let listed: Value = server
        .get("/api/users")
        .authorization_bearer(&token)
        .await
        .json();
    assert!(listed[0].get("passwordDigest").is_none());
}

#[tokio::test]
async fn anonymous_cannot_list_users() {
    let server = test_server().await;
    let res = server.get("/api/users").await;
    res.assert_status_unauthorized();
    res.assert_json(&json!({ "error": "Access denied" }));
}

#[tokio::test]
async fn user_update_and_delete_are_addressed_through_the_body() {
    let server = test_server().await;
    let token = token_for("admin");

    let created: Value = server
        .post("/api/users")
        .authorization_bearer(&token)
        .json(&json!({ "newUser": {
            "username": "alice", "email": "alice@example.com", "password": "longenough"
        } }))
        .await
        .json();
    let id = created["id"].as_str().unwrap();

    let res = server
        .post("/api/users/update")
        .authorization_bearer(&token)
        .json(&json!({ "updatedUser": { "id": id, "data": { "name": "Alice A." } } }))
        .await;
    res.assert_status_ok();
    let updated: Value = res.json();
    assert_eq!(updated["name"], "Alice A.");
    assert_eq!(updated["username"], "alice");

    server
        .post("/api/users/delete")
        .authorization_bearer(&token)
        .json(&json!({ "deletedUser": { "id": id } }))
        .await
        .assert_status_ok();

    server
        .get(&format!("/api/users/{id}"))
        .authorization_bearer(&token)
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn login_issues_a_usable_token() {
    let server = test_server().await;
    let admin_token = token_for("admin");

    server
        .post("/api/users")
        .authorization_bearer(&admin_token)
        .json(&json!({ "newUser": {
            "username": "alice", "email": "alice@example.com",
            "password": "longenough", "role": "editor"
        } }))
        .await
        .assert_status_ok();

    let res = server
        .post("/api/login")
        .json(&json!({ "username": "alice", "password": "longenough" }))
        .await;
    res.assert_status_ok();

    let body: Value = res.json();
    let token = body["token"].as_str().unwrap().to_string();

    // The issued token carries the editor role, which can read users.
    server
        .get("/api/users")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
    // But not create them.
    server
        .post("/api/users")
        .authorization_bearer(&token)
        .json(&json!({ "newUser": {
            "username": "bob", "email": "bob@example.com", "password": "longenough"
        } }))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn wrong_password_and_unknown_user_both_fail_the_same_way() {
    let server = test_server().await;

    server
        .post("/api/users")
        .authorization_bearer(token_for("admin"))
        .json(&json!({ "newUser": {
            "username": "alice", "email": "alice@example.com", "password": "longenough"
        } }))
        .await
        .assert_status_ok();

    for body in [
        json!({ "username": "alice", "password": "wrong-password" }),
        json!({ "username": "nobody", "password": "longenough" }),
    ] {
        let res = server.post("/api/login").json(&body).await;
        res.assert_status_unauthorized();
        res.assert_json(&json!({ "error": "Invalid username or password" }));
    }
}

#[tokio::test]
async fn forged_token_is_treated_as_anonymous() {
    let server = test_server().await;

    let foreign = slate::core::auth::TokenKeys::new(b"some-other-secret");
    let claims = Claims::new(
        Uuid::new_v4(),
        "intruder".to_string(),
        "superAdmin".to_string(),
        Duration::hours(1),
    );
    let forged = foreign.sign(&claims).unwrap();

    // A forged token never errors, the request just runs anonymously.
    server
        .get("/api/pages")
        .authorization_bearer(&forged)
        .await
        .assert_status_ok();
    server
        .post("/api/pages")
        .authorization_bearer(&forged)
        .json(&json!({ "page": { "name": "Home", "slug": "home" } }))
        .await
        .assert_status_unauthorized();
}
