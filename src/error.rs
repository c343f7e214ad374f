// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Business-rule failures carry a stable code string that clients match
//! on; storage and internal failures are logged and surface without detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("User already exists")]
    Conflict,

    #[error("Authentication required")]
    Unauthenticated,

    /// Unknown email and wrong password both map here.
    #[error("Incorrect email or password")]
    IncorrectCredentials,

    #[error("User has not verified their email")]
    NotVerified,

    #[error("User not found")]
    UserNotFound,

    #[error("User is already activated")]
    AlreadyActivated,

    /// Activation or reset code did not match the stored one.
    #[error("Code is invalid or has expired")]
    CodeExpired,

    #[error("Refresh token not found")]
    TokenNotFound,

    #[error("Old password is incorrect")]
    IncorrectOldPassword,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bot check failed: {0}")]
    BotCheckFailed(String),

    /// `X-Auth-Key` missing or wrong.
    #[error("Invalid auth key or secret")]
    InvalidServiceKey,

    #[error("Store operation timed out: {0}")]
    Timeout(&'static str),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub const USER_EXISTS: &'static str = "UserExists";
    pub const INCORRECT_CREDENTIALS: &'static str = "IncorrectUserNameOrPassword";
    pub const USER_NOT_VERIFIED: &'static str = "UserNotVerified";
    pub const USER_NOT_FOUND: &'static str = "UserNotFound";
    pub const USER_ALREADY_ACTIVATED: &'static str = "UserAlreadyActivated";
    pub const TOKEN_EXPIRED: &'static str = "TokenExpired";
    pub const TOKEN_NOT_FOUND: &'static str = "TokenNotFound";
    pub const INCORRECT_OLD_PASSWORD: &'static str = "IncorrectOldPassword";

    /// Whether the failure came from the store being slow or unreachable.
    /// The engine never retries these; the caller may.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, AppError::Timeout(_) | AppError::Database(_))
    }

    /// HTTP status and client-visible error code for this error.
    fn status_and_code(&self) -> (StatusCode, Option<String>) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            AppError::Conflict => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(Self::USER_EXISTS.to_string()),
            ),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, None),
            AppError::IncorrectCredentials => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(Self::INCORRECT_CREDENTIALS.to_string()),
            ),
            AppError::NotVerified => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(Self::USER_NOT_VERIFIED.to_string()),
            ),
            AppError::UserNotFound => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(Self::USER_NOT_FOUND.to_string()),
            ),
            AppError::AlreadyActivated => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(Self::USER_ALREADY_ACTIVATED.to_string()),
            ),
            AppError::CodeExpired => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(Self::TOKEN_EXPIRED.to_string()),
            ),
            AppError::TokenNotFound => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(Self::TOKEN_NOT_FOUND.to_string()),
            ),
            AppError::IncorrectOldPassword => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(Self::INCORRECT_OLD_PASSWORD.to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
            AppError::BotCheckFailed(msg) => (StatusCode::UNAUTHORIZED, Some(msg.clone())),
            AppError::InvalidServiceKey => (StatusCode::UNAUTHORIZED, Some(self.to_string())),
            AppError::Timeout(op) => {
                tracing::error!(operation = op, "Store operation timed out");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        }
    }
}

/// JSON error envelope
#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();

        let body = ErrorResponse {
            status: "Failed",
            error,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
