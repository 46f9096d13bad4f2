//! Session store boundary.
//!
//! The relay only needs idempotent get-or-create: reconnecting with the same
//! identity resumes the existing record instead of creating a second one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Identity of a conversational session, supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StoreError>;

    async fn create(&self, key: &SessionKey) -> Result<SessionRecord, StoreError>;
}

/// Looks the session up and creates it only when absent.
pub async fn get_or_create(
    store: &dyn SessionStore,
    key: &SessionKey,
) -> Result<SessionRecord, StoreError> {
    if let Some(existing) = store.get(key).await? {
        info!(user_id = %key.user_id, session_id = %key.session_id, "Resuming existing session.");
        return Ok(existing);
    }
    info!(user_id = %key.user_id, session_id = %key.session_id, "Creating new session.");
    store.create(key).await
}

/// Process-local store. Records live until the process exits.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn create(&self, key: &SessionKey) -> Result<SessionRecord, StoreError> {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .entry(key.clone())
            .or_insert_with(|| SessionRecord {
                app_name: key.app_name.clone(),
                user_id: key.user_id.clone(),
                session_id: key.session_id.clone(),
                created_at: Utc::now(),
            });
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionKey {
        SessionKey::new("mission-relay", "pilot-7", "sortie-1")
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = InMemorySessionStore::new();

        let first = get_or_create(&store, &key()).await.unwrap();
        let second = get_or_create(&store, &key()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len().await, 1);
        assert_eq!(first.user_id, "pilot-7");
    }

    #[tokio::test]
    async fn test_distinct_identities_get_distinct_records() {
        let store = InMemorySessionStore::new();
        get_or_create(&store, &key()).await.unwrap();
        get_or_create(&store, &SessionKey::new("mission-relay", "pilot-7", "sortie-2"))
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_existing_session_skips_create() {
        let mut store = MockSessionStore::new();
        store.expect_get().times(1).returning(|k| {
            Ok(Some(SessionRecord {
                app_name: k.app_name.clone(),
                user_id: k.user_id.clone(),
                session_id: k.session_id.clone(),
                created_at: Utc::now(),
            }))
        });
        store.expect_create().never();

        let record = get_or_create(&store, &key()).await.unwrap();
        assert_eq!(record.session_id, "sortie-1");
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let mut store = MockSessionStore::new();
        store
            .expect_get()
            .returning(|_| Err(StoreError::Unavailable("offline".into())));

        let err = get_or_create(&store, &key()).await.unwrap_err();
        assert_eq!(err.to_string(), "Session store unavailable: offline");
    }
}
