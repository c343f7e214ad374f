// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routes for the authenticated user.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::routes::{success, ApiResponse, ValidatedJson};
use crate::services::profile_storage::MAX_PROFILE_BYTES;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Multipart name of the uploaded image.
const PROFILE_FIELD: &str = "file";

/// User routes (require authentication via bearer token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/details", get(get_details).post(update_details))
        .route("/user/change-password", post(change_password))
        .route(
            "/user/profile",
            // Leave headroom for the multipart framing around the file.
            post(upload_profile).layer(DefaultBodyLimit::max(MAX_PROFILE_BYTES + 64 * 1024)),
        )
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateDetailsRequest {
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
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 100))]
    pub oldpassword: String,
    #[serde(rename = "newPassword")]
    #[validate(length(min = 6, max = 100))]
    pub new_password: String,
}

/// Result of a profile image upload.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileUploadResponse {
    /// Public URL of the stored image
    pub filepath: String,
}

async fn get_details(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let profile = state.accounts.me(&user.user_id).await?;
    Ok(ApiResponse::ok(profile))
}

async fn update_details(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<UpdateDetailsRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .accounts
        .update_details(&user.user_id, &req.firstname, &req.lastname)
        .await?;
    Ok(success())
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .accounts
        .change_password(&user.user_id, &req.oldpassword, &req.new_password)
        .await?;
    Ok(success())
}

async fn upload_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ProfileUploadResponse>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some(PROFILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let filepath = state
            .accounts
            .update_profile_image(&user.user_id, &file_name, &bytes)
            .await?;
        return Ok(ApiResponse::ok(ProfileUploadResponse { filepath }));
    }

    Err(AppError::Validation(format!(
        "Missing multipart field '{}'",
        PROFILE_FIELD
    )))
}
