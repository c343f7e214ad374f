// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! reCAPTCHA v3 verification for public account endpoints.

use serde::Deserialize;
use std::time::Duration;

const SITE_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
/// Scores below this are treated as bots.
const MIN_SCORE: f64 = 0.5;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Response body of the siteverify endpoint.
#[derive(Debug, Deserialize)]
pub struct SiteVerifyResponse {
    pub success: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub action: String,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Why a bot check did not pass.
#[derive(Debug, thiserror::Error)]
pub enum RecaptchaError {
    #[error("unsuccessful recaptcha verify request")]
    Unsuccessful,

    #[error("lower received score than expected")]
    LowScore,

    #[error("mismatched recaptcha action")]
    ActionMismatch,

    #[error("recaptcha verification unavailable: {0}")]
    Transport(String),
}

/// Verifies client reCAPTCHA tokens against Google.
#[derive(Clone)]
pub struct RecaptchaVerifier {
    secret: String,
    http: reqwest::Client,
}

impl RecaptchaVerifier {
    pub fn new(secret: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            secret: secret.into(),
            http,
        })
    }

    /// Check a client token for `action`.
    pub async fn verify(&self, response: &str, action: &str) -> Result<(), RecaptchaError> {
        let body: SiteVerifyResponse = self
            .http
            .post(SITE_VERIFY_URL)
            .form(&[("secret", self.secret.as_str()), ("response", response)])
            .send()
            .await
            .map_err(|e| RecaptchaError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| RecaptchaError::Transport(e.to_string()))?;

        check_response(&body, action)
    }
}

/// Apply the acceptance rules to a siteverify response.
pub fn check_response(body: &SiteVerifyResponse, action: &str) -> Result<(), RecaptchaError> {
    if !body.success {
        tracing::debug!(errors = ?body.error_codes, "reCAPTCHA rejected token");
        return Err(RecaptchaError::Unsuccessful);
    }
    if body.score < MIN_SCORE {
        return Err(RecaptchaError::LowScore);
    }
    if !action.is_empty() && body.action != action {
        return Err(RecaptchaError::ActionMismatch);
    }
    Ok(())
}
