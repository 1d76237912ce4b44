use async_trait::async_trait;

use crate::events::{BazaarEvent, Listener};

/// Writes every event through the `log` facade.
///
/// Store outages are always logged at `error`, whatever the configured level.
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
        }
    }

    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }

    fn level_for(&self, event: &BazaarEvent) -> log::Level {
        match event {
            BazaarEvent::StoreUnavailable { .. } => log::Level::Error,
            _ => self.level,
        }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &BazaarEvent) {
        log::log!(
            target: "bazaar::events",
            self.level_for(event),
            "event={} {:?}",
            event.name(),
            event
        );
    }
}
