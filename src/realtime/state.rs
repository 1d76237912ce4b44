use std::fmt;

/// Lifecycle of the managed connection.
///
/// ```text
/// Uninitialized -> Connecting -> Open -> Reconnecting -> Connecting -> ...
///                      |          |           |
///                      +----------+-----------+--> Closed | Errored
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Connecting,
    Open,
    /// Waiting out the backoff before attempt number `attempt`.
    Reconnecting { attempt: u32 },
    /// Closed on request.
    Closed,
    /// Gave up after a failure.
    Errored,
}

impl ConnectionState {
    /// States in which a driver task is alive and a new initiate is refused.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Reconnecting { .. }
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting { .. } => "reconnecting",
            ConnectionState::Closed => "closed",
            ConnectionState::Errored => "errored",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Reconnecting { attempt } => write!(f, "reconnecting(attempt={attempt})"),
            other => f.write_str(other.as_str()),
        }
    }
}
