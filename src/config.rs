// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. Optional integrations (SMTP,
//! reCAPTCHA, the service key) switch themselves off when their variables
//! are absent so a local run only needs `JWT_SECRET`.

use std::env;
use std::time::Duration;

/// Minimum accepted length of the JWT signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, for tests and local development.
    Memory,
}

/// Outbound SMTP settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Sender address, also used as the SMTP username
    pub sender: String,
    pub password: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Service name, used as the access token issuer
    pub app_name: String,
    /// HMAC secret for access tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// Lifetime of issued access tokens
    pub access_token_ttl: Duration,
    /// Upper bound on any single store operation
    pub store_timeout: Duration,
    pub store_backend: StoreBackend,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// CORS origin; `None` allows any origin
    pub allowed_origin: Option<String>,
    /// Public base URL, prefixed to profile image paths
    pub domain: String,
    /// Shared key required in `X-Auth-Key` when set
    pub auth_key: Option<String>,
    /// reCAPTCHA secret; bot-check is disabled when unset
    pub recaptcha_secret: Option<String>,
    pub smtp: Option<SmtpConfig>,
    /// Frontend page that completes email verification
    pub verify_url: String,
    /// Frontend page that completes a password reset
    pub reset_pass_url: String,
    /// Directory profile images are written to
    pub profile_dir: String,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
            .into_bytes();
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(
                "JWT_SECRET",
                format!("must be at least {} bytes", MIN_JWT_SECRET_LEN),
            ));
        }

        let store_backend = match optional("STORE_BACKEND").as_deref() {
            None | Some("firestore") => StoreBackend::Firestore,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid(
                    "STORE_BACKEND",
                    format!("unknown backend '{}'", other),
                ))
            }
        };

        let smtp = match (
            optional("SMTP_HOST"),
            optional("SMTP_SENDER"),
            optional("SMTP_PASSWORD"),
        ) {
            (Some(host), Some(sender), Some(password)) => Some(SmtpConfig {
                host,
                port: parse_or("SMTP_PORT", 587)?,
                sender,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            port: parse_or("PORT", 3000)?,
            app_name: optional("APP_NAME").unwrap_or_else(|| "account-service".to_string()),
            jwt_secret,
            access_token_ttl: Duration::from_secs(parse_or("ACCESS_TOKEN_TTL_SECS", 15 * 60)?),
            store_timeout: Duration::from_secs(parse_or("STORE_TIMEOUT_SECS", 100)?),
            store_backend,
            gcp_project_id: optional("GCP_PROJECT_ID").unwrap_or_else(|| "local-dev".to_string()),
            allowed_origin: optional("ALLOWED_ORIGIN"),
            domain: optional("DOMAIN").unwrap_or_else(|| "http://localhost:3000".to_string()),
            auth_key: optional("AUTH_KEY"),
            recaptcha_secret: optional("RECAPTCHA_SECRET"),
            smtp,
            verify_url: optional("FE_VERIFY_URL")
                .unwrap_or_else(|| "http://localhost:5173/verify".to_string()),
            reset_pass_url: optional("FE_RESET_PASS_URL")
                .unwrap_or_else(|| "http://localhost:5173/reset-password".to_string()),
            profile_dir: optional("PROFILE_DIR").unwrap_or_else(|| "public/profile".to_string()),
        })
    }

    /// Deterministic configuration for tests: in-memory store, no SMTP,
    /// no bot-check, no service key.
    pub fn test_default() -> Self {
        Self {
            port: 3000,
            app_name: "account-service-test".to_string(),
            jwt_secret: b"test_jwt_secret_32_bytes_minimum!!".to_vec(),
            access_token_ttl: Duration::from_secs(15 * 60),
            store_timeout: Duration::from_secs(5),
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            allowed_origin: None,
            domain: "http://localhost:3000".to_string(),
            auth_key: None,
            recaptcha_secret: None,
            smtp: None,
            verify_url: "http://localhost:5173/verify".to_string(),
            reset_pass_url: "http://localhost:5173/reset-password".to_string(),
            profile_dir: std::env::temp_dir()
                .join("account-service-test-profiles")
                .to_string_lossy()
                .into_owned(),
        }
    }
}

/// Read a variable, treating empty or whitespace-only values as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("cannot parse '{}'", raw))),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global, so everything touching them lives in one test.
    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SECRET", "short");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("JWT_SECRET", _))
        ));

        env::set_var("JWT_SECRET", "test_jwt_secret_32_bytes_minimum!!");
        env::set_var("STORE_BACKEND", "memory");
        env::set_var("SMTP_HOST", "smtp.example.com");
        env::remove_var("SMTP_SENDER");
        env::remove_var("PORT");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 3000);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.access_token_ttl, Duration::from_secs(900));
        assert_eq!(config.store_timeout, Duration::from_secs(100));
        // Partial SMTP settings leave email delivery disabled
        assert!(config.smtp.is_none());

        env::set_var("STORE_BACKEND", "postgres");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("STORE_BACKEND", _))
        ));
        env::remove_var("STORE_BACKEND");
    }
}
