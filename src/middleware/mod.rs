// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, bot-check, security, etc.).

pub mod auth;
pub mod recaptcha;
pub mod security;
pub mod service_key;

pub use auth::{require_auth, AuthUser};
pub use recaptcha::require_recaptcha;
pub use service_key::require_service_key;
