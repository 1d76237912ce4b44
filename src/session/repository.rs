//! Session repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{SessionPayload, SessionRecord};
use crate::BazaarError;

/// Storage backend for session records.
///
/// Implementations:
/// - [`InMemorySessionRepository`](super::InMemorySessionRepository): single process, tests
/// - `RedisSessionRepository` (feature `redis_store`): shared across instances
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persists a new session and returns the identifier generated for it.
    async fn create(
        &self,
        payload: SessionPayload,
        expires_at: DateTime<Utc>,
    ) -> Result<String, BazaarError>;

    /// Finds a session by its ID.
    ///
    /// Backends with native expiry may still return a record that has just
    /// expired; callers check [`SessionRecord::is_expired`].
    async fn find(&self, session_id: &str) -> Result<Option<SessionRecord>, BazaarError>;

    /// Overwrites an existing session. The expiry is taken from the record.
    async fn save(&self, record: &SessionRecord) -> Result<(), BazaarError>;

    /// Destroys a session. Destroying an unknown ID is not an error.
    async fn destroy(&self, session_id: &str) -> Result<(), BazaarError>;

    /// Removes expired sessions and returns how many were removed.
    ///
    /// Backends that expire keys themselves return `0`.
    async fn prune_expired(&self) -> Result<u64, BazaarError>;
}
