// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared service key check for API clients.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const AUTH_KEY_HEADER: &str = "x-auth-key";

/// Require `X-Auth-Key` to match the configured key. No-op when no key is
/// configured.
pub async fn require_service_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.config.auth_key.as_deref() {
        let presented = request
            .headers()
            .get(AUTH_KEY_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();

        if !keys_match(presented, expected.as_bytes()) {
            tracing::warn!(path = %request.uri().path(), "Rejected request with bad service key");
            return Err(AppError::InvalidServiceKey);
        }
    }

    Ok(next.run(request).await)
}

fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    // ct_eq on slices of different length returns false without leaking
    // where they differ.
    presented.ct_eq(expected).into()
}
