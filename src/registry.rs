use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::bundle::NodeId;
use crate::error::ProxyError;
use crate::handler::{self, ProxyBuilder, ProxyHandler, ProxyPart, ProxyShared};
use crate::host::EventHost;
use crate::transform::Transform;

// ── Registry key ────────────────────────────────────────────────────────────

/// Composite key of a shorthand registration: source event plus target event.
///
/// Re-derivable from the same two names at removal time, which is what makes
/// the shorthand round trip work without the caller holding anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProxyKey {
    source: String,
    target: String,
}

impl ProxyKey {
    fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_owned(),
            target: target.to_owned(),
        }
    }
}

impl fmt::Display for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.target)
    }
}

// ── Subscription handle ─────────────────────────────────────────────────────

/// Opaque handle to one live proxy subscription.
///
/// The handle holds the exact handler that was subscribed, so releasing it
/// needs no registry lookup and has no miss case. Dropping the handle without
/// calling [`release`](ProxyHandle::release) leaves the subscription active.
pub struct ProxyHandle {
    host: Arc<dyn EventHost>,
    node: NodeId,
    event: String,
    handler: ProxyHandler,
}

impl ProxyHandle {
    /// The subscribed handler, same identity the host received.
    pub fn handler(&self) -> &ProxyHandler {
        &self.handler
    }

    /// Node the subscription is attached to.
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Source event the subscription listens for.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Unsubscribe the exact handler this handle was created with.
    pub fn release(self) {
        self.host
            .unsubscribe(&self.node, &self.event, Some(&self.handler));
    }
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("node", &self.node)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

// ── Proxy instance ──────────────────────────────────────────────────────────

/// Per-component proxy engine: compiles handlers, registers shorthand
/// retargets, and removes them symmetrically.
///
/// Every composed handler built from one instance shares a single
/// re-entrancy flag: while a proxied trigger of the instance is in flight,
/// all other proxies of the same instance refuse to fire. Separate instances
/// never suppress each other.
///
/// Shorthand registrations are recorded in an internal registry keyed by
/// (source, target). Entries accumulate for the life of the instance;
/// removal unsubscribes from the host but deliberately leaves the entry in
/// place, so a later removal of the same pair still resolves the same
/// handler.
pub struct EventProxy {
    shared: Arc<ProxyShared>,
    handlers: Mutex<HashMap<ProxyKey, ProxyHandler>>,
}

impl EventProxy {
    /// Create an instance bound to `host`.
    pub fn new(host: Arc<dyn EventHost>) -> Self {
        Self {
            shared: Arc::new(ProxyShared::new(host)),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Start a typed pipeline bound to this instance.
    pub fn proxy_builder(&self) -> ProxyBuilder {
        ProxyBuilder::new(self.shared.clone())
    }

    /// Compile an ordered parts list into a handler bound to this instance.
    ///
    /// A settings part is accepted only in the final position; anything else
    /// fails with [`ProxyError::MisplacedSettings`] before any handler
    /// exists.
    pub fn compile_proxy<I>(&self, parts: I) -> Result<ProxyHandler, ProxyError>
    where
        I: IntoIterator<Item = ProxyPart>,
    {
        handler::compile(self.shared.clone(), parts)
    }

    /// Handler that re-emits whatever it receives under `target`.
    pub fn retarget_handler(&self, target: &str) -> ProxyHandler {
        self.proxy_builder()
            .transform(Transform::rename(target))
            .build()
    }

    /// Shorthand registration: re-emit `source` events on `node` as `target`.
    ///
    /// The handler is recorded under the (source, target) key first and
    /// subscribed second, so [`unproxy_retarget`](Self::unproxy_retarget)
    /// with the same names recovers the identical handler. Registering the
    /// same pair again replaces the recorded entry while the earlier
    /// subscription stays live on the host.
    pub fn proxy_retarget(
        &self,
        node: &NodeId,
        source: &str,
        target: &str,
    ) -> Result<ProxyHandle, ProxyError> {
        if source.is_empty() || target.is_empty() {
            return Err(ProxyError::EmptyEventName);
        }
        let handler = self.retarget_handler(target);
        let key = ProxyKey::new(source, target);
        let replaced = self
            .handlers
            .lock()
            .insert(key.clone(), handler.clone())
            .is_some();
        if replaced {
            debug!(%key, "replacing recorded retarget proxy");
        }
        self.shared.host.subscribe(node, source, handler.clone());
        debug!(source, target, node = %node, "registered retarget proxy");
        Ok(ProxyHandle {
            host: self.shared.host.clone(),
            node: node.clone(),
            event: source.to_owned(),
            handler,
        })
    }

    /// Subscribe an explicit handler for `source` on `node`.
    ///
    /// Nothing is recorded: the returned handle (or the handler value itself)
    /// is the only way to remove the subscription.
    pub fn proxy_handler(&self, node: &NodeId, source: &str, handler: ProxyHandler) -> ProxyHandle {
        self.shared.host.subscribe(node, source, handler.clone());
        ProxyHandle {
            host: self.shared.host.clone(),
            node: node.clone(),
            event: source.to_owned(),
            handler,
        }
    }

    /// Mirror of [`proxy_retarget`](Self::proxy_retarget): resolve the
    /// recorded handler for (source, target) and delegate its removal.
    ///
    /// A lookup miss still delegates, with no handler, exactly once; hosts
    /// treat that as a no-op. The registry entry itself is never removed, so
    /// the same pair keeps resolving after an unsubscribe.
    pub fn unproxy_retarget(&self, node: &NodeId, source: &str, target: &str) {
        let key = ProxyKey::new(source, target);
        let recorded = self.handlers.lock().get(&key).cloned();
        if recorded.is_none() {
            warn!(%key, "no retarget proxy recorded, delegating removal without a handler");
        }
        self.shared.host.unsubscribe(node, source, recorded.as_ref());
    }

    /// Remove an explicit handler: delegate it to the host unchanged.
    pub fn unproxy_handler(&self, node: &NodeId, source: &str, handler: &ProxyHandler) {
        self.shared.host.unsubscribe(node, source, Some(handler));
    }

    /// Number of recorded shorthand registrations.
    pub fn proxy_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Is a (source, target) retarget recorded on this instance?
    pub fn has_proxy(&self, source: &str, target: &str) -> bool {
        self.handlers
            .lock()
            .contains_key(&ProxyKey::new(source, target))
    }
}
