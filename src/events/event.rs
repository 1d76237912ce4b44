use chrono::{DateTime, Utc};

use crate::session::Role;

/// Component an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Session,
    Realtime,
}

#[derive(Debug, Clone)]
pub enum BazaarEvent {
    // session gateway
    SessionCreated {
        role: Option<Role>,
        at: DateTime<Utc>,
    },
    SessionDestroyed {
        at: DateTime<Utc>,
    },
    SessionExpired {
        at: DateTime<Utc>,
    },
    /// A store round trip failed; the request continued unauthenticated.
    StoreUnavailable {
        reason: String,
        at: DateTime<Utc>,
    },

    // realtime client
    RealtimeStateChanged {
        from: String,
        to: String,
        at: DateTime<Utc>,
    },
}

impl BazaarEvent {
    /// Dot-separated event name for logs and spans.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session.created",
            Self::SessionDestroyed { .. } => "session.destroyed",
            Self::SessionExpired { .. } => "session.expired",
            Self::StoreUnavailable { .. } => "session.store_unavailable",
            Self::RealtimeStateChanged { .. } => "realtime.state_changed",
        }
    }

    pub fn source(&self) -> EventSource {
        match self {
            Self::SessionCreated { .. }
            | Self::SessionDestroyed { .. }
            | Self::SessionExpired { .. }
            | Self::StoreUnavailable { .. } => EventSource::Session,
            Self::RealtimeStateChanged { .. } => EventSource::Realtime,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::SessionCreated { at, .. }
            | Self::SessionDestroyed { at }
            | Self::SessionExpired { at }
            | Self::StoreUnavailable { at, .. }
            | Self::RealtimeStateChanged { at, .. } => *at,
        }
    }
}
