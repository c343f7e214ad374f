// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Account service: user registration, email verification, login, password
//! reset and refresh-token sessions.
//!
//! This crate provides the HTTP API and the account lifecycle engine behind
//! it, backed by Firestore or an in-process store.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{SessionStore, UserStore};
use services::{AccountService, Notifier, RecaptchaVerifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub accounts: AccountService,
    /// Bot-check verifier; `None` disables the check
    pub recaptcha: Option<RecaptchaVerifier>,
}

impl AppState {
    /// Wire the account service to its stores and notifier.
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let recaptcha = match config.recaptcha_secret.as_deref() {
            Some(secret) => Some(RecaptchaVerifier::new(secret)?),
            None => {
                tracing::warn!("RECAPTCHA_SECRET not set, bot-check disabled");
                None
            }
        };

        let accounts = AccountService::new(users, sessions, notifier, &config);

        Ok(Self {
            config,
            accounts,
            recaptcha,
        })
    }
}
