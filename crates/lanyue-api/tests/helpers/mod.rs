//! Shared test helpers for the HTTP integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use lanyue_api::auth::Claims;
use lanyue_api::{AppState, build_router};
use lanyue_cache::CacheManager;
use lanyue_core::config::AppConfig;
use lanyue_database::Repositories;
use lanyue_entity::user::UserRole;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application config
    pub config: AppConfig,
    /// Scratch directory holding storage roots, temp files and thumbnails
    pub dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    /// Parsed JSON body, `Null` when the body is not JSON
    pub body: Value,
}

impl TestApp {
    /// Create a new test application over in-memory stores.
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.auth.jwt_secret = "integration-secret".to_string();
        config.fs.temp_dir = dir.path().join("temp").display().to_string();
        config.preview.thumbnail_dir = dir.path().join("thumbnail").display().to_string();
        config.preview.thumbnail = false;
        std::fs::create_dir_all(&config.fs.temp_dir).expect("Failed to create temp dir");

        let cache = CacheManager::new(&config.cache)
            .await
            .expect("Failed to init cache");
        let state = AppState::build(config.clone(), Repositories::in_memory(), cache)
            .await
            .expect("Failed to build state");

        Self {
            router: build_router(state),
            config,
            dir,
        }
    }

    /// Issue an access token for the given role.
    pub fn token(&self, role: UserRole) -> String {
        let claims = Claims {
            sub: "1".to_string(),
            username: format!("{role}-user"),
            role,
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .expect("Failed to encode token")
    }

    pub fn admin(&self) -> String {
        self.token(UserRole::Admin)
    }

    /// Create and mount a storage rooted in the scratch directory.
    pub async fn mount(&self, name: &str, capacity: i64) -> TestResponse {
        let root = self.dir.path().join("roots").join(name);
        self.post(
            "/api/storage/create",
            serde_json::json!({
                "mount_name": name,
                "root_path": root.display().to_string(),
                "capacity": capacity,
            }),
            Some(&self.admin()),
        )
        .await
    }

    /// Physical directory behind a storage created by [`TestApp::mount`].
    pub fn root_of(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join("roots").join(name)
    }

    pub async fn post(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let body = serde_json::to_vec(&body).expect("Failed to serialize body");
        self.request("POST", path, Body::from(body), &[("content-type", "application/json")], token)
            .await
    }

    pub async fn get(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        token: Option<&str>,
    ) -> TestResponse {
        self.request("GET", path, Body::empty(), headers, token).await
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Body,
        headers: &[(&str, &str)],
        token: Option<&str>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let req = req.body(body).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body")
            .to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}
