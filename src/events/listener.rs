use async_trait::async_trait;

use super::BazaarEvent;

/// Receives every dispatched [`BazaarEvent`].
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use bazaar::events::{BazaarEvent, Listener};
///
/// struct StoreOutageAlert;
///
/// #[async_trait]
/// impl Listener for StoreOutageAlert {
///     async fn handle(&self, event: &BazaarEvent) {
///         if let BazaarEvent::StoreUnavailable { reason, .. } = event {
///             // page the on-call
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    async fn handle(&self, event: &BazaarEvent);
}
