// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (account records)
//! - User emails (create-only reservations enforcing email uniqueness)
//! - Refresh tokens (sessions keyed by token digest)
//!
//! Every read-check-write sequence runs inside a Firestore transaction with
//! its reads bound to that transaction, so a concurrent writer makes the
//! commit fail instead of being silently overwritten.

use crate::db::{collections, user_not_matched, SessionStore, UserStore};
use crate::error::AppError;
use crate::models::user::EmailReservation;
use crate::models::{RefreshToken, User};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use firestore::{FirestoreConsistencySelector, FirestoreTransaction, FirestoreWritePrecondition};
use std::borrow::Cow;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Document ID of the reservation for a normalised email.
fn email_key(email: &str) -> Cow<'_, str> {
    urlencoding::encode(email)
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes any bearer token; skip credential discovery.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Transaction Helpers ─────────────────────────────────────

    /// A client whose reads are part of `transaction`.
    fn transactional_reader(
        &self,
        transaction: &FirestoreTransaction<'_>,
    ) -> Result<firestore::FirestoreDb, AppError> {
        Ok(self
            .get_client()?
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            )))
    }

    async fn get_user_in(
        reader: &firestore::FirestoreDb,
        user_id: &str,
    ) -> Result<Option<User>, AppError> {
        reader
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_reservation_in(
        reader: &firestore::FirestoreDb,
        email: &str,
    ) -> Result<Option<EmailReservation>, AppError> {
        reader
            .fluent()
            .select()
            .by_id_in(collections::USER_EMAILS)
            .obj()
            .one(email_key(email).as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read a user, let `apply` modify it, and write it back atomically.
    ///
    /// `locate` resolves the user ID inside the transaction (by ID or via the
    /// email reservation). `apply` returns `false` to abandon the write.
    /// Returns the written user, or `None` if nothing was located or `apply`
    /// declined.
    async fn modify_user<F>(
        &self,
        locate: UserLocator<'_>,
        apply: F,
    ) -> Result<Option<User>, AppError>
    where
        F: FnOnce(&mut User) -> bool + Send,
    {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let reader = self.transactional_reader(&transaction)?;

        let user_id = match locate {
            UserLocator::Id(id) => Some(id.to_string()),
            UserLocator::Email(email) => Self::get_reservation_in(&reader, email)
                .await?
                .map(|r| r.user_id),
        };

        let current = match user_id {
            Some(id) => Self::get_user_in(&reader, &id).await?,
            None => None,
        };

        let Some(mut user) = current else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };

        if !apply(&mut user) {
            let _ = transaction.rollback().await;
            return Ok(None);
        }
        user.updated_at = now_rfc3339();

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(&user.id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(Some(user))
    }

    /// `modify_user` by ID, where no match is an error.
    async fn modify_user_by_id<F>(&self, id: &str, apply: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut User) + Send,
    {
        self.modify_user(UserLocator::Id(id), |user| {
            apply(user);
            true
        })
        .await?
        .map(|_| ())
        .ok_or_else(|| user_not_matched(id))
    }
}

/// How `modify_user` finds its target.
enum UserLocator<'a> {
    Id(&'a str),
    Email(&'a str),
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl UserStore for FirestoreDb {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let client = self.get_client()?;
        let reservation = EmailReservation {
            user_id: user.id.clone(),
            created_at: user.created_at.clone(),
        };

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Both writes are create-only; an existing reservation fails the commit.
        client
            .fluent()
            .update()
            .in_col(collections::USER_EMAILS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(email_key(&user.email).as_ref())
            .object(&reservation)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add reservation to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            // A failed precondition looks like any other commit error, so
            // check whether someone else now owns the email.
            if self.email_exists(&user.email).await.unwrap_or(false) {
                tracing::warn!(user_id = %user.id, "Email reserved concurrently");
                return Err(AppError::Conflict);
            }
            return Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            )));
        }

        Ok(())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(Self::get_reservation_in(self.get_client()?, email)
            .await?
            .is_some())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let client = self.get_client()?;
        match Self::get_reservation_in(client, email).await? {
            Some(reservation) => Self::get_user_in(client, &reservation.user_id).await,
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Self::get_user_in(self.get_client()?, id).await
    }

    async fn activate(
        &self,
        email: &str,
        code: &str,
        new_password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        self.modify_user(UserLocator::Email(email), |user| {
            if user.activation_code != code {
                return false;
            }
            user.activated = true;
            if let Some(hash) = new_password_hash {
                user.password_hash = hash.to_string();
            }
            true
        })
        .await
    }

    async fn replace_activation_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<User>, AppError> {
        self.modify_user(UserLocator::Email(email), |user| {
            user.activation_code = code.to_string();
            true
        })
        .await
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        self.modify_user_by_id(id, |user| user.password_hash = password_hash.to_string())
            .await
    }

    async fn update_profile(&self, id: &str, profile: &str) -> Result<(), AppError> {
        self.modify_user_by_id(id, |user| user.profile = Some(profile.to_string()))
            .await
    }

    async fn update_details(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), AppError> {
        self.modify_user_by_id(id, |user| {
            user.first_name = first_name.to_string();
            user.last_name = last_name.to_string();
        })
        .await
    }
}

// ─── Session Operations ──────────────────────────────────────

#[async_trait]
impl SessionStore for FirestoreDb {
    async fn insert_session(&self, session: &RefreshToken) -> Result<(), AppError> {
        let _: RefreshToken = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REFRESH_TOKENS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&session.id)
            .object(session)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_owner(&self, token_digest: &str) -> Result<Option<String>, AppError> {
        let session: Option<RefreshToken> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REFRESH_TOKENS)
            .obj()
            .one(token_digest)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(session.map(|s| s.user_id))
    }

    async fn delete_session(&self, token_digest: &str) -> Result<(), AppError> {
        // Firestore deletes of missing documents succeed, which keeps logout idempotent.
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::REFRESH_TOKENS)
            .document_id(token_digest)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
