use serde_json::Value;

use crate::bundle::NodeId;
use crate::handler::ProxyHandler;

/// The surrounding publish/subscribe mechanism the proxy layer plugs into.
///
/// Implementations must be `Send + Sync` because one host is shared by every
/// handler of a proxy instance via `Arc`. All three hooks are synchronous:
/// the proxy layer calls them inline and expects them to complete before the
/// call returns. [`LocalBus`](crate::LocalBus) is the in-crate
/// implementation; anything that can subscribe, unsubscribe, and emit can
/// stand in for it.
pub trait EventHost: Send + Sync {
    /// Attach `handler` so it fires whenever `event` occurs on `node`.
    fn subscribe(&self, node: &NodeId, event: &str, handler: ProxyHandler);

    /// Inverse of [`subscribe`](EventHost::subscribe).
    ///
    /// `handler` is a clone of the exact value a prior subscribe received
    /// (compare with [`ProxyHandler::ptr_eq`]), or `None` when a shorthand
    /// removal found nothing recorded for its key. Removing an unknown or
    /// absent handler must be a non-fatal no-op.
    fn unsubscribe(&self, node: &NodeId, event: &str, handler: Option<&ProxyHandler>);

    /// Emit `event` with payload `data`, addressed at `node`.
    ///
    /// Proxied re-emissions arrive here after the transform pipeline has run.
    fn trigger(&self, node: &NodeId, event: &str, data: Value);
}

/// The raw event value a host hands to a firing handler.
///
/// Suppression hooks take `&self`; hosts keep those flags interior-mutable so
/// one event value can be shared across a whole dispatch.
pub trait RawEvent {
    /// Event-name identifier, consumed verbatim into the bundle.
    fn name(&self) -> &str;

    /// Originating target, consumed verbatim into the bundle.
    fn target(&self) -> &NodeId;

    /// Suppress the host's default action for this event.
    fn prevent_default(&self);

    /// Suppress further propagation of this event.
    fn stop_propagation(&self);
}
