// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Refresh token (session) model.

use serde::{Deserialize, Serialize};

/// A login session that can mint new access tokens until revoked.
///
/// The opaque value handed to the client is never stored; `id` is its
/// SHA-256 digest, which doubles as the document ID and so is unique.
/// Sessions have no server-side expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Hex SHA-256 digest of the opaque token value
    pub id: String,
    /// User this session authenticates
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}
