// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication, service key and CORS tests.
//!
//! These tests verify that:
//! 1. User routes reject requests without valid tokens, with no detail
//! 2. User routes accept requests with valid tokens
//! 3. The service key gates /auth and /user but not /health
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

mod common;

async fn details_with_auth(app: &common::TestApp, auth: Option<&str>) -> StatusCode {
    let mut builder = Request::builder().method("GET").uri("/user/details");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    app.send(builder.body(Body::empty()).unwrap()).await.status()
}

#[tokio::test]
async fn test_user_route_without_token() {
    let app = common::create_test_app();

    let response = app
        .send(
            Request::builder()
                .method("GET")
                .uri("/user/details")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::read_json(response).await;
    assert_eq!(body, json!({ "status": "Failed" }));
}

#[tokio::test]
async fn test_user_route_with_bad_tokens() {
    let app = common::create_test_app();

    for auth in [
        "Bearer invalid.token.here",
        "Bearer ",
        "Basic dXNlcjpwYXNz",
        "invalid.token.here",
    ] {
        assert_eq!(
            details_with_auth(&app, Some(auth)).await,
            StatusCode::UNAUTHORIZED,
            "{auth}"
        );
    }
}

#[tokio::test]
async fn test_user_route_with_valid_token() {
    let app = common::create_test_app();
    app.register_and_verify("a@x.com", "secret1").await;
    let (access, _) = app.login_tokens("a@x.com", "secret1").await;

    assert_eq!(
        details_with_auth(&app, Some(&format!("Bearer {}", access))).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_token_for_missing_user_is_unauthenticated() {
    let app = common::create_test_app();
    let token = app
        .state
        .accounts
        .token_service()
        .issue("ghost", std::time::Duration::from_secs(60))
        .unwrap();

    assert_eq!(
        details_with_auth(&app, Some(&format!("Bearer {}", token))).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_service_key_required_when_configured() {
    let mut config = common::test_config();
    config.auth_key = Some("shared-key".to_string());
    let app = common::create_test_app_with(config);

    let body = json!({ "email": "a@x.com" });

    let response = app
        .send(common::json_request(
            Method::POST,
            "/auth/forgot-password",
            &body,
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = common::read_json(response).await;
    assert_eq!(json["error"], "Invalid auth key or secret");

    let mut request = common::json_request(Method::POST, "/auth/forgot-password", &body, None);
    request
        .headers_mut()
        .insert("x-auth-key", "wrong-key".parse().unwrap());
    assert_eq!(app.send(request).await.status(), StatusCode::UNAUTHORIZED);

    let mut request = common::json_request(Method::POST, "/auth/forgot-password", &body, None);
    request
        .headers_mut()
        .insert("x-auth-key", "shared-key".parse().unwrap());
    // Key accepted; the account simply does not exist
    assert_eq!(
        app.send(request).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    // Health stays open
    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = common::create_test_app();

    let response = app
        .send(
            Request::builder()
                .method("OPTIONS")
                .uri("/auth/login")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_cors_restricted_origin() {
    let mut config = common::test_config();
    config.allowed_origin = Some("https://app.example.com".to_string());
    let app = common::create_test_app_with(config);

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/auth/login")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app.send(preflight("https://app.example.com")).await;
    assert_eq!(
        allowed
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://app.example.com"
    );

    let denied = app.send(preflight("https://evil.example.com")).await;
    assert!(!denied
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_health_no_auth_required() {
    let app = common::create_test_app();

    let response = app
        .send(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["status"], "ok");
}
