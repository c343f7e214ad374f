// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod user;

use crate::error::AppError;
use crate::middleware::{require_auth, require_recaptcha, require_service_key};
use crate::AppState;
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderName, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationErrors};

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

// ─── Response envelope ───────────────────────────────────────

/// Success envelope: `{"status": "Success", "data": ...}`.
///
/// Failures use the same shape with `"Failed"`; see [`AppError`].
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            status: "Success",
            data: Some(data),
        })
    }
}

/// Success with no payload.
pub fn success() -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        status: "Success",
        data: None,
    })
}

// ─── Validated JSON extractor ────────────────────────────────

/// JSON body that has passed its `validator` rules.
///
/// Malformed JSON and rule violations both become `400` validation errors.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AppError::Validation(describe_errors(&errors)))?;
        Ok(Self(value))
    }
}

/// `field: rule` pairs, sorted by field. Rejected values are never echoed
/// since they may be passwords.
fn describe_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter()
                .map(move |e| format!("{}: {}", field, e.code))
                .collect::<Vec<_>>()
        })
        .collect();
    parts.sort();
    parts.join(", ")
}

// ─── Router ──────────────────────────────────────────────────

fn cors_layer(allowed_origin: Option<String>) -> CorsLayer {
    let origin = match allowed_origin {
        Some(allowed) => AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                origin.as_bytes() == allowed.as_bytes()
            },
        ),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(crate::middleware::service_key::AUTH_KEY_HEADER),
        ])
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Public account flows, each behind the bot-check
    let bot_checked = auth::bot_checked_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_recaptcha));

    // Authenticated user routes
    let protected =
        user::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Everything under /auth and /user needs the service key when one is set
    let api = Router::new()
        .merge(bot_checked)
        .merge(auth::session_routes())
        .merge(protected)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_service_key,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(api)
        .nest_service(
            "/public/profile",
            ServeDir::new(&state.config.profile_dir),
        )
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors_layer(state.config.allowed_origin.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
