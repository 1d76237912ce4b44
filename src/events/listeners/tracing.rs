use async_trait::async_trait;

use crate::events::{BazaarEvent, Listener};

/// Emits events as `tracing` events under the `bazaar::events` target.
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &BazaarEvent) {
        match event {
            BazaarEvent::StoreUnavailable { reason, .. } => {
                tracing::error!(target: "bazaar::events", event_name = event.name(), %reason, "session store unavailable");
            }
            _ => {
                tracing::info!(target: "bazaar::events", event_name = event.name(), ?event, "bazaar event");
            }
        }
    }
}
