// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile image upload and static serving tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};

mod common;

const BOUNDARY: &str = "----account-service-test-boundary";

fn multipart_upload(token: &str, field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/user/profile")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn logged_in_app() -> (common::TestApp, String) {
    let app = common::create_test_app();
    app.register_and_verify("a@x.com", "secret1").await;
    let (access, _) = app.login_tokens("a@x.com", "secret1").await;
    (app, access)
}

#[tokio::test]
async fn test_upload_sets_profile_and_serves_file() {
    let (app, access) = logged_in_app().await;

    let response = app
        .send(multipart_upload(&access, "file", "me.png", b"fake-png-bytes"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    let url = body["data"]["filepath"].as_str().unwrap().to_string();
    assert!(url.starts_with("http://localhost:3000/public/profile/"));
    assert!(url.ends_with(".png"));

    let (_, me) = app
        .json_authed(
            axum::http::Method::GET,
            "/user/details",
            serde_json::json!({}),
            &access,
        )
        .await;
    assert_eq!(me["data"]["profile"], url.as_str());

    let path = url.trim_start_matches("http://localhost:3000");
    let response = app
        .send(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"fake-png-bytes");
}

#[tokio::test]
async fn test_replacing_image_removes_previous_file() {
    let (app, access) = logged_in_app().await;

    let first = common::read_json(
        app.send(multipart_upload(&access, "file", "one.png", b"one"))
            .await,
    )
    .await;
    let first_path = first["data"]["filepath"]
        .as_str()
        .unwrap()
        .trim_start_matches("http://localhost:3000")
        .to_string();

    let response = app
        .send(multipart_upload(&access, "file", "two.jpg", b"two"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(Request::builder().uri(first_path).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_bad_files() {
    let (app, access) = logged_in_app().await;

    let response = app
        .send(multipart_upload(&access, "file", "script.sh", b"#!/bin/sh"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(multipart_upload(&access, "avatar", "me.png", b"png"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let too_big = vec![0u8; 5 * 1024 * 1024 + 1];
    let response = app
        .send(multipart_upload(&access, "file", "big.png", &too_big))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_requires_auth() {
    let app = common::create_test_app();

    let response = app
        .send(multipart_upload("not-a-token", "file", "me.png", b"png"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
