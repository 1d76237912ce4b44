//! In-memory session storage.
//!
//! Suitable for development, tests and single-instance deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::repository::SessionRepository;
use super::{SessionPayload, SessionRecord};
use crate::BazaarError;
use crate::crypto::generate_session_id;

/// Sessions kept in a `HashMap` behind a `RwLock`.
///
/// Clones share the same map. Sessions are lost when the process exits.
#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sessions currently stored.
    pub fn len(&self) -> usize {
        self.sessions.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> BazaarError {
    BazaarError::Store("Lock poisoned".to_owned())
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(
        &self,
        payload: SessionPayload,
        expires_at: DateTime<Utc>,
    ) -> Result<String, BazaarError> {
        let session_id = generate_session_id();
        let record = SessionRecord {
            id: session_id.clone(),
            payload,
            created_at: Utc::now(),
            expires_at,
        };

        self.sessions
            .write()
            .map_err(|_| poisoned())?
            .insert(session_id.clone(), record);

        Ok(session_id)
    }

    async fn find(&self, session_id: &str) -> Result<Option<SessionRecord>, BazaarError> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), BazaarError> {
        self.sessions
            .write()
            .map_err(|_| poisoned())?
            .insert(record.id.clone(), record.clone());

        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), BazaarError> {
        self.sessions
            .write()
            .map_err(|_| poisoned())?
            .remove(session_id);

        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn prune_expired(&self) -> Result<u64, BazaarError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;

        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, record| record.expires_at > now);

        let pruned = before.saturating_sub(sessions.len());
        Ok(u64::try_from(pruned).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::session::Role;

    fn payload(identity: &str) -> SessionPayload {
        SessionPayload::for_principal(Role::Customer, identity)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemorySessionRepository::new();
        let expires_at = Utc::now() + Duration::days(7);

        let id = repo.create(payload("user-1"), expires_at).await.unwrap();
        assert_eq!(id.len(), 32);

        let record = repo.find(&id).await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.payload.identity.as_deref(), Some("user-1"));
        assert_eq!(record.expires_at, expires_at);
    }

    #[tokio::test]
    async fn test_find_unknown() {
        let repo = InMemorySessionRepository::new();
        assert!(repo.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_payload() {
        let repo = InMemorySessionRepository::new();
        let id = repo
            .create(payload("user-1"), Utc::now() + Duration::days(7))
            .await
            .unwrap();

        let mut record = repo.find(&id).await.unwrap().unwrap();
        record
            .payload
            .attributes
            .insert("cart_items".to_owned(), serde_json::json!(3));
        repo.save(&record).await.unwrap();

        let stored = repo.find(&id).await.unwrap().unwrap();
        assert_eq!(stored.payload.attributes["cart_items"], 3);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_destroy() {
        let repo = InMemorySessionRepository::new();
        let id = repo
            .create(payload("user-1"), Utc::now() + Duration::days(7))
            .await
            .unwrap();

        repo.destroy(&id).await.unwrap();
        assert!(repo.is_empty());

        // unknown ids are fine
        repo.destroy(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_prune_expired() {
        let repo = InMemorySessionRepository::new();
        repo.create(payload("old"), Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        repo.create(payload("fresh"), Utc::now() + Duration::days(7))
            .await
            .unwrap();

        assert_eq!(repo.prune_expired().await.unwrap(), 1);
        assert_eq!(repo.len(), 1);
    }
}
