//! Lifecycle events from the session gateway and the realtime client.
//!
//! Events are dispatched to whatever listeners were registered at startup.
//! With no listeners registered, dispatch is a no-op.
//!
//! ```rust,ignore
//! use bazaar::register_event_listeners;
//! use bazaar::events::EventSource;
//! use bazaar::events::listeners::LoggingListener;
//!
//! register_event_listeners(|registry| {
//!     registry.listen_to(EventSource::Session, LoggingListener::new());
//! });
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::{BazaarEvent, EventSource};
pub use listener::Listener;
pub use registry::{EventRegistry, dispatch, register_event_listeners};
