//! Redis-backed session storage.
//!
//! Records are stored as JSON under `{prefix}:{session_id}` with a native
//! TTL equal to the remaining session lifetime, so Redis expires them on
//! its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use super::repository::SessionRepository;
use super::{SessionPayload, SessionRecord};
use crate::BazaarError;
use crate::crypto::generate_session_id;

pub const DEFAULT_KEY_PREFIX: &str = "bazaar:sess";

#[derive(Clone)]
pub struct RedisSessionRepository {
    client: redis::Client,
    prefix: String,
}

impl RedisSessionRepository {
    /// Parses the connection URL. No connection is made until first use.
    pub fn new(redis_url: &str, prefix: impl Into<String>) -> Result<Self, BazaarError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| BazaarError::Configuration(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}:{}", self.prefix, session_id)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, BazaarError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BazaarError::Store(format!("redis connection error: {e}")))
    }

    /// Round-trips a `PING` to check the store is reachable.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "redis_ping", skip_all, err))]
    pub async fn ping(&self) -> Result<(), BazaarError> {
        let mut conn = self.connection().await?;
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| BazaarError::Store(format!("redis ping error: {e}")))?;
        Ok(())
    }

    async fn write(&self, record: &SessionRecord) -> Result<(), BazaarError> {
        let ttl = record.ttl_secs();
        if ttl == 0 {
            return Ok(());
        }

        let json = serde_json::to_string(record)?;
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(self.key(&record.id), json, ttl)
            .await
            .map_err(|e| BazaarError::Store(format!("redis set error: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl SessionRepository for RedisSessionRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "session_create", skip_all, err))]
    async fn create(
        &self,
        payload: SessionPayload,
        expires_at: DateTime<Utc>,
    ) -> Result<String, BazaarError> {
        let record = SessionRecord {
            id: generate_session_id(),
            payload,
            created_at: Utc::now(),
            expires_at,
        };
        self.write(&record).await?;
        Ok(record.id)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "session_find", skip_all, err))]
    async fn find(&self, session_id: &str) -> Result<Option<SessionRecord>, BazaarError> {
        let mut conn = self.connection().await?;
        let data: Option<String> = conn
            .get(self.key(session_id))
            .await
            .map_err(|e| BazaarError::Store(format!("redis get error: {e}")))?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "session_save", skip_all, err))]
    async fn save(&self, record: &SessionRecord) -> Result<(), BazaarError> {
        self.write(record).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "session_destroy", skip_all, err))]
    async fn destroy(&self, session_id: &str) -> Result<(), BazaarError> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(self.key(session_id))
            .await
            .map_err(|e| BazaarError::Store(format!("redis del error: {e}")))?;
        Ok(())
    }

    async fn prune_expired(&self) -> Result<u64, BazaarError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefixing() {
        let repo = RedisSessionRepository::new("redis://127.0.0.1:6379", "shop").unwrap();
        assert_eq!(repo.key("abc"), "shop:abc");
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let result = RedisSessionRepository::new("not a url", DEFAULT_KEY_PREFIX);
        assert!(matches!(result, Err(BazaarError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_store_error() {
        // port 1 is never a redis server
        let repo = RedisSessionRepository::new("redis://127.0.0.1:1", DEFAULT_KEY_PREFIX).unwrap();
        assert!(matches!(repo.ping().await, Err(BazaarError::Store(_))));
        assert!(matches!(repo.find("abc").await, Err(BazaarError::Store(_))));
    }
}
