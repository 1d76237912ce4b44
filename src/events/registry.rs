use std::sync::OnceLock;

use super::{BazaarEvent, EventSource, Listener};

static REGISTRY: OnceLock<EventRegistry> = OnceLock::new();

struct Subscription {
    /// `None` receives events from every source.
    source: Option<EventSource>,
    listener: Box<dyn Listener>,
}

impl Subscription {
    fn wants(&self, event: &BazaarEvent) -> bool {
        self.source.is_none_or(|source| source == event.source())
    }
}

/// Listeners registered at startup, each scoped to one event source or to
/// all of them. Matching listeners run in registration order.
#[derive(Default)]
pub struct EventRegistry {
    subscriptions: Vec<Subscription>,
}

impl EventRegistry {
    /// Subscribes `listener` to session and realtime events alike.
    pub fn listen(&mut self, listener: impl Listener) -> &mut Self {
        self.subscribe(None, listener)
    }

    /// Subscribes `listener` to events from `source` only.
    pub fn listen_to(&mut self, source: EventSource, listener: impl Listener) -> &mut Self {
        self.subscribe(Some(source), listener)
    }

    fn subscribe(&mut self, source: Option<EventSource>, listener: impl Listener) -> &mut Self {
        self.subscriptions.push(Subscription {
            source,
            listener: Box::new(listener),
        });
        self
    }

    /// Number of listeners that would receive events from `source`.
    pub fn listener_count(&self, source: EventSource) -> usize {
        self.subscriptions
            .iter()
            .filter(|subscription| subscription.source.is_none_or(|s| s == source))
            .count()
    }

    async fn dispatch(&self, event: &BazaarEvent) {
        for subscription in self.subscriptions.iter().filter(|s| s.wants(event)) {
            subscription.listener.handle(event).await;
        }
    }
}

/// Installs the process-wide listeners. Only the first call takes effect.
pub fn register_event_listeners<F>(f: F)
where
    F: FnOnce(&mut EventRegistry),
{
    let mut registry = EventRegistry::default();
    f(&mut registry);

    let session = registry.listener_count(EventSource::Session);
    let realtime = registry.listener_count(EventSource::Realtime);
    if REGISTRY.set(registry).is_err() {
        log::warn!(target: "bazaar::events", "msg=\"event listeners already registered, ignoring\"");
        return;
    }
    log::debug!(
        target: "bazaar::events",
        "msg=\"event listeners registered\" session={session} realtime={realtime}"
    );
}

/// Sends an event to the registered listeners for its source.
pub async fn dispatch(event: BazaarEvent) {
    if let Some(registry) = REGISTRY.get() {
        registry.dispatch(&event).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;

    struct Recorder {
        tag: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Listener for Recorder {
        async fn handle(&self, event: &BazaarEvent) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.tag, event.name()));
        }
    }

    fn state_changed() -> BazaarEvent {
        BazaarEvent::RealtimeStateChanged {
            from: "connecting".to_owned(),
            to: "open".to_owned(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_scoped_listeners_only_see_their_source() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EventRegistry::default();
        registry
            .listen_to(EventSource::Session, Recorder { tag: "session", seen: Arc::clone(&seen) })
            .listen(Recorder { tag: "all", seen: Arc::clone(&seen) });

        registry
            .dispatch(&BazaarEvent::SessionDestroyed { at: Utc::now() })
            .await;
        registry.dispatch(&state_changed()).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "session:session.destroyed".to_owned(),
                "all:session.destroyed".to_owned(),
                "all:realtime.state_changed".to_owned(),
            ]
        );
    }

    #[test]
    fn test_listener_count_per_source() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EventRegistry::default();
        registry
            .listen_to(EventSource::Realtime, Recorder { tag: "rt", seen: Arc::clone(&seen) })
            .listen(Recorder { tag: "all", seen });

        assert_eq!(registry.listener_count(EventSource::Session), 1);
        assert_eq!(registry.listener_count(EventSource::Realtime), 2);
    }

    #[tokio::test]
    async fn test_dispatch_without_registry_is_noop() {
        dispatch(BazaarEvent::SessionExpired { at: Utc::now() }).await;
    }
}
