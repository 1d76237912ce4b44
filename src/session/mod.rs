//! Cookie-backed sessions shared by the customer, shop and admin roles.
//!
//! The browser only ever holds a signed, opaque session identifier. The
//! payload lives in a [`SessionRepository`] (in-memory, or Redis with the
//! `redis_store` feature) and is looked up once per request by the
//! [`SessionGateway`].

mod config;
mod cookie;
mod gateway;
mod memory_store;
#[cfg(feature = "redis_store")]
mod redis_store;
mod repository;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
pub use config::{SESSION_LIFETIME_DAYS, SameSite, SessionConfig};
pub use cookie::{build_removal_cookie, build_session_cookie, sign_session_id, verify_signed_cookie};
pub use gateway::{CookieUpdate, Session, SessionGateway};
pub use memory_store::InMemorySessionRepository;
#[cfg(feature = "redis_store")]
pub use redis_store::{DEFAULT_KEY_PREFIX, RedisSessionRepository};
pub use repository::SessionRepository;
use serde::{Deserialize, Serialize};

use crate::BazaarError;

/// The principal kinds sharing the session namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Shop,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Shop => "shop",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BazaarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" | "user" => Ok(Role::Customer),
            "shop" | "seller" => Ok(Role::Shop),
            "admin" => Ok(Role::Admin),
            other => Err(BazaarError::Configuration(format!("unknown role '{other}'"))),
        }
    }
}

/// Data stored against a session identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Reference to the authenticated user, shop or admin account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl SessionPayload {
    pub fn for_principal(role: Role, identity: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            identity: Some(identity.into()),
            attributes: serde_json::Map::new(),
        }
    }

    /// A payload with nothing worth persisting.
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.identity.is_none() && self.attributes.is_empty()
    }

    pub fn is_authenticated(&self) -> bool {
        self.role.is_some() && self.identity.is_some()
    }
}

/// A session as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub payload: SessionPayload,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Seconds until expiry, `0` once expired.
    pub fn ttl_secs(&self) -> u64 {
        u64::try_from((self.expires_at - Utc::now()).num_seconds()).unwrap_or(0)
    }
}
