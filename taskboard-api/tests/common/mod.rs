/// Common test utilities for integration tests
///
/// Builds the full router over in-memory stores and drives it with
/// `tower::ServiceExt::oneshot`, so no server or database is needed.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::store::Stores;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Configuration that never reads the process environment
pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/taskboard_test".to_string()),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        _ => None,
    })
    .expect("test config")
}

/// Test context: one app over one set of in-memory stores
pub struct TestContext {
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let state = AppState::new(Stores::in_memory(), test_config());
        Self {
            app: build_router(state),
        }
    }

    /// Sends a request and returns the status with the parsed JSON body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Registers a fresh user and returns `(user id, token)`
    pub async fn register(&self, name: &str) -> (Uuid, String) {
        let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4());
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        let id = body["data"]["user"]["id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("user id");
        let token = body["data"]["token"].as_str().expect("token").to_string();
        (id, token)
    }

    /// Creates a project for the token's owner and returns its id
    pub async fn create_project(&self, token: &str, name: &str) -> Uuid {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/projects",
                Some(token),
                Some(json!({ "name": name, "description": "A project for testing" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
        body["data"]["id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("project id")
    }
}
