// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod notifier;
pub mod password;
pub mod profile_storage;
pub mod recaptcha;
pub mod token;

pub use account::{AccountService, LoginOutput};
pub use notifier::{LogNotifier, Notifier, RecordingNotifier, SmtpNotifier};
pub use profile_storage::ProfileStorage;
pub use recaptcha::{RecaptchaError, RecaptchaVerifier};
pub use token::{Claims, TokenError, TokenService};
