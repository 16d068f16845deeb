use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::bundle::NodeId;
use crate::handler::ProxyHandler;
use crate::host::{EventHost, RawEvent};

// ── Raw event ───────────────────────────────────────────────────────────────

/// Raw event value handed to listeners during a [`LocalBus`] dispatch.
///
/// One value is shared by every listener of the dispatch, so suppression by
/// an early listener is visible to later ones and to the dispatcher.
pub struct BusEvent {
    name: String,
    target: NodeId,
    default_prevented: AtomicBool,
    propagation_stopped: AtomicBool,
}

impl BusEvent {
    fn new(name: &str, target: &NodeId) -> Self {
        Self {
            name: name.to_owned(),
            target: target.clone(),
            default_prevented: AtomicBool::new(false),
            propagation_stopped: AtomicBool::new(false),
        }
    }

    /// Has any listener suppressed the default action?
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::Acquire)
    }

    /// Has any listener stopped propagation?
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.load(Ordering::Acquire)
    }
}

impl RawEvent for BusEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &NodeId {
        &self.target
    }

    fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::Release);
    }

    fn stop_propagation(&self) {
        self.propagation_stopped.store(true, Ordering::Release);
    }
}

// ── Dispatch outcome ────────────────────────────────────────────────────────

/// What one synchronous [`LocalBus::dispatch`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Listeners actually invoked.
    pub delivered: usize,
    /// A listener suppressed the default action.
    pub default_prevented: bool,
    /// A listener stopped delivery to the rest of the list.
    pub propagation_stopped: bool,
}

// ── Local bus ───────────────────────────────────────────────────────────────

type ListenerKey = (NodeId, String);

/// In-memory synchronous [`EventHost`].
///
/// Listeners are keyed by (node, event) and invoked in subscription order.
/// `trigger` re-enters `dispatch`, so a proxied re-emission is delivered
/// before the dispatch that caused it returns; that nesting is exactly what
/// the proxy re-entrancy guard exists for.
///
/// Dispatch iterates over a snapshot of the listener list taken before the
/// first invocation, so listeners may subscribe and unsubscribe freely while
/// handling an event; changes take effect from the next dispatch on.
#[derive(Default)]
pub struct LocalBus {
    listeners: Mutex<HashMap<ListenerKey, Vec<ProxyHandler>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronously deliver `event` on `node` to every listener.
    ///
    /// Delivery stops early once a listener stops propagation; on this flat
    /// bus "propagation" means the remainder of the listener list.
    pub fn dispatch(&self, node: &NodeId, event: &str, data: Value) -> DispatchOutcome {
        let key = (node.clone(), event.to_owned());
        let snapshot: Vec<ProxyHandler> = self
            .listeners
            .lock()
            .get(&key)
            .cloned()
            .unwrap_or_default();

        let raw = BusEvent::new(event, node);
        let mut outcome = DispatchOutcome::default();
        for handler in &snapshot {
            handler.handle(&raw, data.clone());
            outcome.delivered += 1;
            if raw.propagation_stopped() {
                break;
            }
        }
        outcome.default_prevented = raw.default_prevented();
        outcome.propagation_stopped = raw.propagation_stopped();
        outcome
    }

    /// Listeners currently attached for `event` on `node`.
    pub fn listener_count(&self, node: &NodeId, event: &str) -> usize {
        self.listeners
            .lock()
            .get(&(node.clone(), event.to_owned()))
            .map_or(0, Vec::len)
    }
}

impl EventHost for LocalBus {
    fn subscribe(&self, node: &NodeId, event: &str, handler: ProxyHandler) {
        debug!(node = %node, event, "attaching listener");
        self.listeners
            .lock()
            .entry((node.clone(), event.to_owned()))
            .or_default()
            .push(handler);
    }

    fn unsubscribe(&self, node: &NodeId, event: &str, handler: Option<&ProxyHandler>) {
        let Some(handler) = handler else {
            debug!(node = %node, event, "unsubscribe without a handler, ignoring");
            return;
        };
        let key = (node.clone(), event.to_owned());
        let mut listeners = self.listeners.lock();
        if let Some(list) = listeners.get_mut(&key) {
            list.retain(|existing| !existing.ptr_eq(handler));
            if list.is_empty() {
                listeners.remove(&key);
            }
        }
    }

    fn trigger(&self, node: &NodeId, event: &str, data: Value) {
        self.dispatch(node, event, data);
    }
}
