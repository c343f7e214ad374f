// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle: registration, activation, login, password reset and
//! change, and refresh-token sessions.
//!
//! Per user the state is `{activated, activation_code}`:
//!
//! ```text
//! register ──> pending (activated = false)
//! pending  ──verify_email(code)──> active
//! active   ──forgot_password──> active, new code
//! any      ──reset_password(code)──> active, new password hash
//! ```
//!
//! The service holds no mutable state of its own. Cross-record rules
//! (unique email, code match) are enforced by the stores' atomic
//! operations, and every store call is bounded by the configured timeout.

use crate::config::Config;
use crate::db::{SessionStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::{user::profile_url, RefreshToken, User, UserProfile};
use crate::services::notifier::Notifier;
use crate::services::password::{hash_password_blocking, verify_password_blocking};
use crate::services::profile_storage::ProfileStorage;
use crate::services::token::{generate_refresh_token, refresh_token_digest, TokenService};
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutput {
    pub access_token: String,
    /// Opaque session token; only its digest is stored
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Trim and lower-case an email so lookups are exact matches.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The authenticated user's record is gone; treat the caller as signed out.
fn missing_user_is_unauthenticated(err: AppError) -> AppError {
    match err {
        AppError::NotFound(_) => AppError::Unauthenticated,
        other => other,
    }
}

fn new_activation_code() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The account lifecycle engine.
pub struct AccountService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    tokens: TokenService,
    notifier: Arc<dyn Notifier>,
    profiles: ProfileStorage,
    access_token_ttl: Duration,
    store_timeout: Duration,
    domain: String,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens: TokenService::new(&config.jwt_secret, config.app_name.clone()),
            notifier,
            profiles: ProfileStorage::new(&config.profile_dir),
            access_token_ttl: config.access_token_ttl,
            store_timeout: config.store_timeout,
            domain: config.domain.clone(),
        }
    }

    pub fn token_service(&self) -> &TokenService {
        &self.tokens
    }

    /// Run a store operation under the store timeout.
    async fn store<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| AppError::Timeout(operation))?
    }

    fn profile_of(&self, user: &User) -> UserProfile {
        UserProfile::from_user(user, &self.domain)
    }

    // ─── Public account flows ────────────────────────────────

    /// Create a pending account and send its activation code.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<()> {
        let email = normalize_email(email);

        // Fast path for a clear error; the store insert is the real guarantee.
        if self.store("email_exists", self.users.email_exists(&email)).await? {
            return Err(AppError::Conflict);
        }

        let password_hash = hash_password_blocking(password).await?;
        let now = now_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            password_hash,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            activation_code: new_activation_code(),
            activated: false,
            profile: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.store("insert_user", self.users.insert_user(&user)).await?;
        tracing::info!(user_id = %user.id, "User registered");

        self.notifier
            .send_activation(&user.email, &user.first_name, &user.activation_code)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Failed to send activation email");
                AppError::Internal(e.context("send activation email"))
            })
    }

    /// Activate the account whose current code matches.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<()> {
        let email = normalize_email(email);
        let user = self
            .store("activate", self.users.activate(&email, code, None))
            .await?
            .ok_or(AppError::CodeExpired)?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutput> {
        let email = normalize_email(email);
        let Some(user) = self.store("find_by_email", self.users.find_by_email(&email)).await? else {
            tracing::info!(reason = "unknown_email", "Login rejected");
            return Err(AppError::IncorrectCredentials);
        };

        if !verify_password_blocking(password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, reason = "wrong_password", "Login rejected");
            return Err(AppError::IncorrectCredentials);
        }

        if !user.activated {
            tracing::info!(user_id = %user.id, reason = "not_verified", "Login rejected");
            return Err(AppError::NotVerified);
        }

        let access_token = self.tokens.issue(&user.id, self.access_token_ttl)?;

        let refresh_token = generate_refresh_token();
        let now = now_rfc3339();
        let session = RefreshToken {
            id: refresh_token_digest(&refresh_token),
            user_id: user.id.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.store("insert_session", self.sessions.insert_session(&session))
            .await?;

        tracing::info!(user_id = %user.id, "Login succeeded, session created");

        Ok(LoginOutput {
            access_token,
            refresh_token,
            user: self.profile_of(&user),
        })
    }

    /// Mint a new access token from a live session.
    ///
    /// The refresh token itself is neither rotated nor expired.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let digest = refresh_token_digest(refresh_token);
        let user_id = self
            .store("find_owner", self.sessions.find_owner(&digest))
            .await?
            .ok_or(AppError::TokenNotFound)?;

        Ok(self.tokens.issue(&user_id, self.access_token_ttl)?)
    }

    /// Revoke a session. Unknown tokens are not an error.
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let digest = refresh_token_digest(refresh_token);
        self.store("delete_session", self.sessions.delete_session(&digest))
            .await?;
        tracing::info!("Session revoked");
        Ok(())
    }

    /// Issue a fresh code and email it as a password reset.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let code = new_activation_code();
        let user = self
            .store(
                "replace_activation_code",
                self.users.replace_activation_code(&email, &code),
            )
            .await?
            .ok_or(AppError::UserNotFound)?;

        tracing::info!(user_id = %user.id, "Password reset requested");

        self.notifier
            .send_password_reset(&user.email, &user.first_name, &code)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
                AppError::Internal(e.context("send password reset email"))
            })
    }

    /// Send the current activation code again.
    pub async fn resend_activation_email(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let user = self
            .store("find_by_email", self.users.find_by_email(&email))
            .await?
            .ok_or(AppError::UserNotFound)?;

        if user.activated {
            return Err(AppError::AlreadyActivated);
        }

        self.notifier
            .send_activation(&user.email, &user.first_name, &user.activation_code)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Failed to resend activation email");
                AppError::Internal(e.context("resend activation email"))
            })
    }

    /// Replace the password of the account whose current code matches.
    ///
    /// Completing a reset also activates an unverified account.
    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<()> {
        let email = normalize_email(email);
        let password_hash = hash_password_blocking(new_password).await?;
        let user = self
            .store(
                "activate",
                self.users.activate(&email, code, Some(&password_hash)),
            )
            .await?
            .ok_or(AppError::CodeExpired)?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    // ─── Authenticated flows ─────────────────────────────────

    /// Resolve an access token to its user ID.
    pub fn authenticate(&self, access_token: &str) -> Result<String> {
        self.tokens
            .validate(access_token)
            .map(|claims| claims.sub)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AppError::Unauthenticated
            })
    }

    /// Public projection of the authenticated user.
    pub async fn me(&self, user_id: &str) -> Result<UserProfile> {
        let user = self
            .store("find_by_id", self.users.find_by_id(user_id))
            .await?
            .ok_or(AppError::Unauthenticated)?;
        Ok(self.profile_of(&user))
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self
            .store("find_by_id", self.users.find_by_id(user_id))
            .await?
            .ok_or(AppError::Unauthenticated)?;

        if !verify_password_blocking(old_password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, "Password change rejected: old password mismatch");
            return Err(AppError::IncorrectOldPassword);
        }

        let password_hash = hash_password_blocking(new_password).await?;
        self.store(
            "update_password",
            self.users.update_password(&user.id, &password_hash),
        )
        .await
        .map_err(missing_user_is_unauthenticated)?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    pub async fn update_details(&self, user_id: &str, first_name: &str, last_name: &str) -> Result<()> {
        self.store(
            "update_details",
            self.users
                .update_details(user_id, first_name.trim(), last_name.trim()),
        )
        .await
        .map_err(missing_user_is_unauthenticated)
    }

    /// Point the user at an already stored profile asset.
    pub async fn update_profile(&self, user_id: &str, asset: &str) -> Result<()> {
        self.store("update_profile", self.users.update_profile(user_id, asset))
            .await
            .map_err(missing_user_is_unauthenticated)
    }

    /// Store an uploaded image as the user's profile picture and return its
    /// public URL. The previous image is removed afterwards if possible.
    pub async fn update_profile_image(
        &self,
        user_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let user = self
            .store("find_by_id", self.users.find_by_id(user_id))
            .await?
            .ok_or(AppError::Unauthenticated)?;

        let stored = self.profiles.store(file_name, bytes).await?;

        if let Err(e) = self.update_profile(&user.id, &stored).await {
            // A timed-out write may still land, so the file must stay.
            if !matches!(e, AppError::Timeout(_)) {
                self.remove_profile_file(&user.id, &stored).await;
            }
            return Err(e);
        }

        if let Some(previous) = user.profile.as_deref() {
            self.remove_profile_file(&user.id, previous).await;
        }

        tracing::info!(user_id = %user.id, "Profile image updated");
        Ok(profile_url(&self.domain, &stored))
    }

    /// Best-effort cleanup; the caller's operation has already been decided.
    async fn remove_profile_file(&self, user_id: &str, file: &str) {
        if let Err(e) = self.profiles.remove(file).await {
            tracing::warn!(user_id, file, error = %e, "Failed to remove profile image");
        }
    }
}
