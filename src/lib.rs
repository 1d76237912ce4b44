//! Session gateway, realtime client and single-page app host for the
//! Bhavya Bazaar storefront.
//!
//! The crate is organised around three facilities:
//!
//! - [`session`]: a cookie-backed session gateway over a pluggable store
//!   (in-memory or Redis), shared by the customer, shop and admin roles.
//! - [`realtime`]: an explicitly owned WebSocket connection manager with
//!   reconnect and backoff.
//! - [`api`]: the HTTP surface, serving the SPA bundle, `/health`, the
//!   runtime config script and the session endpoints.

pub mod api;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod events;
#[cfg(feature = "realtime")]
pub mod realtime;
pub mod reducers;
pub mod runtime_config;
mod secret;
pub mod session;

pub use config::BazaarConfig;
pub use events::register_event_listeners;
pub use secret::SecretString;

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum BazaarError {
    /// A required setting is missing or malformed.
    Configuration(String),
    /// The session store rejected or could not serve a request.
    Store(String),
    Serialization(String),
    /// A request body was well-formed but unacceptable.
    Validation(String),
    SessionInvalid,
    SessionExpired,
    Unauthorized,
    Forbidden,
    NotFound,
    /// No realtime endpoint could be resolved from configuration.
    MissingEndpoint,
    /// The realtime connection is already connecting or open.
    AlreadyActive,
    Connection(String),
    Io(String),
}

impl std::error::Error for BazaarError {}

impl fmt::Display for BazaarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BazaarError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            BazaarError::Store(msg) => write!(f, "Session store error: {msg}"),
            BazaarError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BazaarError::Validation(msg) => write!(f, "Validation error: {msg}"),
            BazaarError::SessionInvalid => write!(f, "Invalid session"),
            BazaarError::SessionExpired => write!(f, "Session has expired"),
            BazaarError::Unauthorized => write!(f, "Authentication required"),
            BazaarError::Forbidden => write!(f, "Forbidden"),
            BazaarError::NotFound => write!(f, "Not found"),
            BazaarError::MissingEndpoint => write!(f, "No realtime endpoint configured"),
            BazaarError::AlreadyActive => write!(f, "Realtime connection already active"),
            BazaarError::Connection(msg) => write!(f, "Connection error: {msg}"),
            BazaarError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl From<serde_json::Error> for BazaarError {
    fn from(err: serde_json::Error) -> Self {
        BazaarError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for BazaarError {
    fn from(err: std::io::Error) -> Self {
        BazaarError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            BazaarError::Configuration("SESSION_SECRET is not set".to_owned()).to_string(),
            "Configuration error: SESSION_SECRET is not set"
        );
        assert_eq!(BazaarError::Unauthorized.to_string(), "Authentication required");
        assert_eq!(
            BazaarError::MissingEndpoint.to_string(),
            "No realtime endpoint configured"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let converted = BazaarError::from(err);
        assert!(matches!(converted, BazaarError::Serialization(_)));
    }
}
