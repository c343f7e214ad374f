// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account Service API Server
//!
//! Registration, email verification, login and session renewal for the
//! frontend apps.

use account_service::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb, SessionStore, UserStore},
    services::notifier,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, app = %config.app_name, "Starting account service");

    let (users, sessions): (Arc<dyn UserStore>, Arc<dyn SessionStore>) =
        match config.store_backend {
            StoreBackend::Firestore => {
                let db = FirestoreDb::new(&config.gcp_project_id).await?;
                (Arc::new(db.clone()), Arc::new(db))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store, data is lost on restart");
                let db = MemoryDb::new();
                (Arc::new(db.clone()), Arc::new(db))
            }
        };

    let notifier = notifier::from_config(&config)?;

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), users, sessions, notifier)?);

    // Build router
    let app = account_service::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("account_service=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
