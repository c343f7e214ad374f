// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use account_service::config::Config;
use account_service::db::{FirestoreDb, MemoryDb};
use account_service::routes::create_router;
use account_service::services::notifier::{NotificationKind, RecordingNotifier};
use account_service::AppState;
use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// A router wired to an in-memory store and a recording notifier.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub notifier: Arc<RecordingNotifier>,
}

/// Test configuration with a profile directory private to this app.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::test_default();
    config.profile_dir = std::env::temp_dir()
        .join(format!("account-service-it-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    config
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(test_config())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let db = MemoryDb::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let state = Arc::new(
        AppState::new(
            config,
            Arc::new(db.clone()),
            Arc::new(db.clone()),
            notifier.clone(),
        )
        .expect("Failed to build app state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        notifier,
    }
}

#[allow(dead_code)]
impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a JSON request and return status plus parsed body.
    pub async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self.send(json_request(method, uri, &body, None)).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    /// Same as [`TestApp::json`] with a bearer token.
    pub async fn json_authed(
        &self,
        method: Method,
        uri: &str,
        body: Value,
        token: &str,
    ) -> (StatusCode, Value) {
        let response = self.send(json_request(method, uri, &body, Some(token))).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    pub fn activation_code(&self, email: &str) -> String {
        self.notifier
            .last_code(NotificationKind::Activation, email)
            .expect("no activation email sent")
    }

    pub fn reset_code(&self, email: &str) -> String {
        self.notifier
            .last_code(NotificationKind::PasswordReset, email)
            .expect("no reset email sent")
    }

    pub async fn register(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            "/auth/register",
            serde_json::json!({
                "email": email,
                "password": password,
                "firstname": "Ada",
                "lastname": "Lovelace",
            }),
        )
        .await
    }

    pub async fn register_and_verify(&self, email: &str, password: &str) {
        let (status, _) = self.register(email, password).await;
        assert_eq!(status, StatusCode::OK);

        let code = self.activation_code(email);
        let (status, _) = self
            .json(
                Method::POST,
                "/auth/verify",
                serde_json::json!({ "email": email, "code": code }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            "/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Log in and return `(access_token, refresh_token)`.
    pub async fn login_tokens(&self, email: &str, password: &str) -> (String, String) {
        let (status, body) = self.login(email, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (
            body["data"]["accessToken"].as_str().unwrap().to_string(),
            body["data"]["refreshToken"].as_str().unwrap().to_string(),
        )
    }
}

#[allow(dead_code)]
pub fn json_request(method: Method, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Parse a response body as JSON; `Value::Null` when empty.
#[allow(dead_code)]
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
