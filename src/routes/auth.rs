// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public account routes: registration, verification, login, sessions and
//! password reset.

use crate::error::Result;
use crate::routes::{success, ApiResponse, ValidatedJson};
use crate::services::LoginOutput;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Routes that require a passing bot-check (applied in routes/mod.rs).
///
/// The last path segment of each is also its reCAPTCHA action name.
pub fn bot_checked_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify", post(verify))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/resend-activation-email", post(resend_activation_email))
        .route("/auth/reset-password", post(reset_password))
}

/// Session routes keyed by the refresh token.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/refresh/{token_id}", put(refresh))
        .route("/auth/logout/{token_id}", put(logout))
}

// ─── Request bodies ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegisterRequest {
    #[validate(email, length(min = 2, max = 100))]
    pub email: String,
    #[validate(length(min = 6, max = 100))]
    pub password: String,
    #[validate(length(min = 2, max = 100))]
    pub firstname: String,
    #[validate(length(min = 2, max = 100))]
    pub lastname: String,
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginRequest {
    #[validate(email, length(min = 2, max = 100))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub password: String,
}

/// Body of `/auth/verify`.
#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerifyRequest {
    #[validate(email, length(min = 2, max = 100))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub code: String,
}

/// Body of the flows that only need an address.
#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EmailRequest {
    #[validate(email, length(min = 2, max = 100))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ResetPasswordRequest {
    #[validate(email, length(min = 2, max = 100))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub password: String,
}

/// Result of a token refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RefreshResponse {
    pub access_token: String,
}

// ─── Handlers ────────────────────────────────────────────────

async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .accounts
        .register(&req.email, &req.password, &req.firstname, &req.lastname)
        .await?;
    Ok(success())
}

async fn verify(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<VerifyRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state.accounts.verify_email(&req.email, &req.code).await?;
    Ok(success())
}

async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginOutput>>> {
    let output = state.accounts.login(&req.email, &req.password).await?;
    Ok(ApiResponse::ok(output))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(token_id): Path<String>,
) -> Result<Json<ApiResponse<RefreshResponse>>> {
    let access_token = state.accounts.refresh(&token_id).await?;
    Ok(ApiResponse::ok(RefreshResponse { access_token }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Path(token_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    state.accounts.logout(&token_id).await?;
    Ok(success())
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<EmailRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state.accounts.forgot_password(&req.email).await?;
    Ok(success())
}

async fn resend_activation_email(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<EmailRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state.accounts.resend_activation_email(&req.email).await?;
    Ok(success())
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .accounts
        .reset_password(&req.email, &req.code, &req.password)
        .await?;
    Ok(success())
}
