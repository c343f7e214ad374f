// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User account stored in Firestore.
///
/// Only the account service mutates these records, and they are never
/// deleted in the normal flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque server-generated ID (also used as document ID)
    pub id: String,
    /// Normalised (trimmed, lower-cased) email, unique across users
    pub email: String,
    /// Argon2 PHC string, never the plaintext
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// Current verification / reset code. Kept after use.
    pub activation_code: String,
    /// False until the email is verified; gates login
    pub activated: bool,
    /// Stored profile image file name
    pub profile: Option<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
    /// Last write (RFC 3339)
    pub updated_at: String,
}

/// Reservation document keyed by normalised email.
///
/// Firestore has no unique indexes, so registration creates one of these
/// with a create-only write; a second registration for the same email
/// fails at the store instead of racing past the existence check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailReservation {
    pub user_id: String,
    pub created_at: String,
}

/// Public projection of a user returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    /// Absolute URL of the profile image, empty when none is set
    pub profile: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UserProfile {
    /// Build the projection; `domain` is the public base URL serving `/public`.
    pub fn from_user(user: &User, domain: &str) -> Self {
        let profile = user
            .profile
            .as_deref()
            .map(|file| profile_url(domain, file))
            .unwrap_or_default();

        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            display_name: format!("{} {}", user.first_name, user.last_name),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile,
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

/// Public URL of a stored profile image.
pub fn profile_url(domain: &str, file: &str) -> String {
    format!("{}/public/profile/{}", domain.trim_end_matches('/'), file)
}
