//! Client side of the realtime channel.
//!
//! A [`ConnectionManager`] owns at most one WebSocket connection to the
//! message server. It is created explicitly and passed to whoever needs it;
//! clones share the same connection.
//!
//! ```rust,ignore
//! use bazaar::realtime::{ConnectionManager, RealtimeConfig, RealtimeMessage};
//!
//! let manager = ConnectionManager::new(RealtimeConfig {
//!     endpoint: Some("wss://bhavyabazaar.com/ws".to_owned()),
//!     ..Default::default()
//! });
//! manager.initiate()?;
//! let mut inbound = manager.subscribe();
//! manager.send(&RealtimeMessage::new("PING", serde_json::json!({}))?);
//! ```

mod backoff;
mod manager;
mod message;
mod state;

use std::time::Duration;

pub use backoff::BackoffConfig;
pub use manager::ConnectionManager;
pub use message::{CLIENT_CONNECTED, Inbound, RealtimeMessage};
pub use state::ConnectionState;

/// Default time allowed for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// `ws://` or `wss://` URL of the message server.
    pub endpoint: Option<String>,
    /// Reconnect with backoff after the connection drops.
    pub reconnect: bool,
    pub backoff: BackoffConfig,
    pub connect_timeout: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            reconnect: true,
            backoff: BackoffConfig::standard(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl RealtimeConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }

    /// The endpoint, if one is set and non-blank.
    pub fn resolved_endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }
}
