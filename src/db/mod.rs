// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! The account service only sees the [`UserStore`] and [`SessionStore`]
//! traits. [`FirestoreDb`] is the production backend; [`MemoryDb`] keeps
//! everything in process for tests and local runs.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{RefreshToken, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email reservations (keyed by url-encoded normalised email)
    pub const USER_EMAILS: &str = "user_emails";
    /// Sessions (keyed by refresh token digest)
    pub const REFRESH_TOKENS: &str = "refresh_tokens";
}

/// Persistence for user accounts.
///
/// Emails passed in are already normalised. Every lookup is an exact match.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`AppError::Conflict`] when the email
    /// is already taken, even if a concurrent registration got there first.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Atomically match `{email, activation_code}` and mark the user
    /// activated, replacing the password hash when one is given.
    ///
    /// Returns the updated user, or `None` when nothing matched. The code is
    /// left in place.
    async fn activate(
        &self,
        email: &str,
        code: &str,
        new_password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError>;

    /// Atomically replace the activation code of the user with this email.
    /// Returns the updated user, or `None` when there is no such user.
    async fn replace_activation_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<User>, AppError>;

    /// Replace the password hash. Fails with [`AppError::NotFound`] unless
    /// exactly one user matched.
    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), AppError>;

    /// Set the stored profile image. Same matching rule as `update_password`.
    async fn update_profile(&self, id: &str, profile: &str) -> Result<(), AppError>;

    /// Set display names. Same matching rule as `update_password`.
    async fn update_details(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), AppError>;
}

/// Persistence for refresh token sessions, addressed by token digest.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session; the digest must not already exist.
    async fn insert_session(&self, session: &RefreshToken) -> Result<(), AppError>;

    /// Owning user ID of the session with this digest.
    async fn find_owner(&self, token_digest: &str) -> Result<Option<String>, AppError>;

    /// Delete the session. Deleting a missing session is not an error.
    async fn delete_session(&self, token_digest: &str) -> Result<(), AppError>;
}

/// Error for a targeted update that matched no user.
pub(crate) fn user_not_matched(id: &str) -> AppError {
    AppError::NotFound(format!("User {} not found", id))
}
