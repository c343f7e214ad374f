// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bot-check middleware for the public account endpoints.

use crate::error::AppError;
use crate::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// JSON body field carrying the client token.
pub const RECAPTCHA_FIELD: &str = "g-recaptcha-response";

/// Account request bodies are small; anything bigger is not ours.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Verify the request's reCAPTCHA token before the handler sees it.
///
/// The expected action is the last path segment (`/auth/login` -> `login`).
/// The body is buffered and handed on unchanged. Passes everything through
/// when no verifier is configured.
pub async fn require_recaptcha(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(verifier) = state.recaptcha.as_ref() else {
        return Ok(next.run(request).await);
    };

    let action = request
        .uri()
        .path()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::Validation("Request body too large".to_string()))?;

    let token = extract_token(&bytes)
        .ok_or_else(|| AppError::BotCheckFailed("missing reCAPTCHA token".to_string()))?;

    verifier.verify(&token, &action).await.map_err(|e| {
        tracing::warn!(action = %action, error = %e, "Bot check failed");
        AppError::BotCheckFailed(e.to_string())
    })?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Read the token from a JSON body; `None` when absent, empty or not JSON.
fn extract_token(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get(RECAPTCHA_FIELD)?
        .as_str()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token() {
        assert_eq!(
            extract_token(br#"{"email":"a@x.com","g-recaptcha-response":"tok"}"#).as_deref(),
            Some("tok")
        );
        assert!(extract_token(br#"{"email":"a@x.com"}"#).is_none());
        assert!(extract_token(br#"{"g-recaptcha-response":""}"#).is_none());
        assert!(extract_token(b"not json").is_none());
    }
}
