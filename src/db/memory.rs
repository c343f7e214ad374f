// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by `DashMap`.
//!
//! Mirrors the Firestore backend's semantics: the email index gives
//! registration a real uniqueness guarantee, and conditional updates hold
//! the entry lock for the whole match-and-write.

use crate::db::{user_not_matched, SessionStore, UserStore};
use crate::error::AppError;
use crate::models::{RefreshToken, User};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory user and session store. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    /// email -> user id
    emails: Arc<DashMap<String, String>>,
    /// token digest -> session
    sessions: Arc<DashMap<String, RefreshToken>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions (used by tests).
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn id_for_email(&self, email: &str) -> Option<String> {
        self.emails.get(email).map(|id| id.value().clone())
    }

    fn update_by_id<F>(&self, id: &str, apply: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut User),
    {
        let mut user = self.users.get_mut(id).ok_or_else(|| user_not_matched(id))?;
        apply(user.value_mut());
        user.updated_at = now_rfc3339();
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict),
            Entry::Vacant(slot) => {
                // Insert the user before releasing the email slot so readers
                // never see a reservation without its record.
                self.users.insert(user.id.clone(), user.clone());
                slot.insert(user.id.clone());
                Ok(())
            }
        }
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.emails.contains_key(email))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .id_for_email(email)
            .and_then(|id| self.users.get(&id).map(|u| u.value().clone())))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn activate(
        &self,
        email: &str,
        code: &str,
        new_password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let Some(id) = self.id_for_email(email) else {
            return Ok(None);
        };
        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(None);
        };
        if user.activation_code != code {
            return Ok(None);
        }

        user.activated = true;
        if let Some(hash) = new_password_hash {
            user.password_hash = hash.to_string();
        }
        user.updated_at = now_rfc3339();
        Ok(Some(user.clone()))
    }

    async fn replace_activation_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<User>, AppError> {
        let Some(id) = self.id_for_email(email) else {
            return Ok(None);
        };
        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(None);
        };

        user.activation_code = code.to_string();
        user.updated_at = now_rfc3339();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        self.update_by_id(id, |user| user.password_hash = password_hash.to_string())
    }

    async fn update_profile(&self, id: &str, profile: &str) -> Result<(), AppError> {
        self.update_by_id(id, |user| user.profile = Some(profile.to_string()))
    }

    async fn update_details(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), AppError> {
        self.update_by_id(id, |user| {
            user.first_name = first_name.to_string();
            user.last_name = last_name.to_string();
        })
    }
}

#[async_trait]
impl SessionStore for MemoryDb {
    async fn insert_session(&self, session: &RefreshToken) -> Result<(), AppError> {
        match self.sessions.entry(session.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Database(
                "Duplicate refresh token digest".to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(())
            }
        }
    }

    async fn find_owner(&self, token_digest: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .sessions
            .get(token_digest)
            .map(|s| s.user_id.clone()))
    }

    async fn delete_session(&self, token_digest: &str) -> Result<(), AppError> {
        self.sessions.remove(token_digest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, email: &str) -> User {
        let now = now_rfc3339();
        User {
            id: id.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            activation_code: "code-1".to_string(),
            activated: false,
            profile: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_at_store() {
        let db = MemoryDb::new();
        db.insert_user(&user("u1", "a@x.com")).await.unwrap();

        let err = db.insert_user(&user("u2", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict));
        assert!(db.find_by_id("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activate_requires_matching_code() {
        let db = MemoryDb::new();
        db.insert_user(&user("u1", "a@x.com")).await.unwrap();

        assert!(db.activate("a@x.com", "wrong", None).await.unwrap().is_none());
        assert!(db.activate("b@x.com", "code-1", None).await.unwrap().is_none());

        let activated = db.activate("a@x.com", "code-1", None).await.unwrap().unwrap();
        assert!(activated.activated);
        assert_eq!(activated.activation_code, "code-1");
        assert_eq!(activated.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_targeted_update_of_missing_user_fails() {
        let db = MemoryDb::new();
        let err = db.update_details("nobody", "A", "B").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_session_delete_is_idempotent() {
        let db = MemoryDb::new();
        let now = now_rfc3339();
        let session = RefreshToken {
            id: "digest".to_string(),
            user_id: "u1".to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        db.insert_session(&session).await.unwrap();
        assert!(db.insert_session(&session).await.is_err());

        assert_eq!(db.find_owner("digest").await.unwrap().as_deref(), Some("u1"));
        db.delete_session("digest").await.unwrap();
        db.delete_session("digest").await.unwrap();
        assert!(db.find_owner("digest").await.unwrap().is_none());
    }
}
