//! Integration tests for bearer token checks and role gating.

mod helpers;

use axum::http::StatusCode;
use lanyue_entity::user::UserRole;

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = helpers::TestApp::new().await;

    let response = app
        .post("/api/storage/list", serde_json::json!({}), None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_forged_token_is_unauthorized() {
    let app = helpers::TestApp::new().await;

    let response = app
        .post("/api/upload_task/list", serde_json::json!({}), Some("not.a.token"))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_regular_user_is_forbidden() {
    let app = helpers::TestApp::new().await;
    let token = app.token(UserRole::User);

    let response = app
        .post("/api/storage/list", serde_json::json!({}), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "AUTHORIZATION");
}

#[tokio::test]
async fn test_health_is_public() {
    let app = helpers::TestApp::new().await;

    let response = app.get("/api/health", &[], None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["mounts"], 0);
}
