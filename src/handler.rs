use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::bundle::Bundle;
use crate::error::ProxyError;
use crate::host::{EventHost, RawEvent};
use crate::transform::Transform;

// ── Execution settings ──────────────────────────────────────────────────────

/// Fire-time execution settings of a composed proxy.
///
/// Both flags default to off. The corresponding [`RawEvent`] hooks are
/// invoked before anything else happens in the dispatch, re-entrancy
/// suppression included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Suppress the host's default action for the incoming raw event.
    pub prevent_default: bool,
    /// Stop the incoming raw event from propagating further.
    pub stop_propagation: bool,
}

// ── Tagged proxy parts ──────────────────────────────────────────────────────

/// One element of an ordered proxy description, as accepted by
/// [`EventProxy::compile_proxy`](crate::EventProxy::compile_proxy).
///
/// A settings part is legal only as the final element of the list.
#[derive(Debug, Clone)]
pub enum ProxyPart {
    /// A transform to compose into the pipeline.
    Transform(Transform),
    /// Fire-time execution settings.
    Settings(DispatchSettings),
}

impl From<Transform> for ProxyPart {
    fn from(transform: Transform) -> Self {
        Self::Transform(transform)
    }
}

impl From<DispatchSettings> for ProxyPart {
    fn from(settings: DispatchSettings) -> Self {
        Self::Settings(settings)
    }
}

// ── Shared instance state ───────────────────────────────────────────────────

/// State shared by every composed handler built from one proxy instance.
pub(crate) struct ProxyShared {
    pub(crate) host: Arc<dyn EventHost>,
    /// Set while a proxied trigger of this instance is in flight.
    firing: AtomicBool,
}

impl ProxyShared {
    pub(crate) fn new(host: Arc<dyn EventHost>) -> Self {
        Self {
            host,
            firing: AtomicBool::new(false),
        }
    }
}

/// Exclusive hold on the instance re-entrancy flag.
///
/// Acquisition fails while any proxied trigger of the same instance is in
/// flight. Release happens on drop, which covers every exit path out of the
/// dispatch, panicking emit hooks included.
struct TriggerGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> TriggerGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(Self { flag })
    }
}

impl Drop for TriggerGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ── Proxy handler ───────────────────────────────────────────────────────────

enum HandlerKind {
    /// Built by the builder or the parts compiler: transform pipeline,
    /// settings, and the owning instance's shared state.
    Composed {
        transform: Transform,
        settings: DispatchSettings,
        shared: Arc<ProxyShared>,
    },
    /// A bare listener passed through untouched, with no transform and no
    /// re-entrancy guard.
    Direct(Box<dyn Fn(&dyn RawEvent, Value) + Send + Sync>),
}

/// A callable event handler, as hosts see it.
///
/// Clones share identity: [`ptr_eq`](ProxyHandler::ptr_eq) between a stored
/// clone and the value originally subscribed is how symmetric removal finds
/// its listener.
#[derive(Clone)]
pub struct ProxyHandler {
    inner: Arc<HandlerKind>,
}

impl ProxyHandler {
    pub(crate) fn composed(
        transform: Transform,
        settings: DispatchSettings,
        shared: Arc<ProxyShared>,
    ) -> Self {
        Self {
            inner: Arc::new(HandlerKind::Composed {
                transform,
                settings,
                shared,
            }),
        }
    }

    /// Wrap a bare listener for the direct pass-through path.
    ///
    /// Direct handlers skip the whole proxy machinery: no bundle, no
    /// transforms, no re-entrancy guard.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&dyn RawEvent, Value) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(HandlerKind::Direct(Box::new(f))),
        }
    }

    /// Identity comparison: do both values wrap the same underlying handler?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Fire-time settings of a composed handler, `None` for direct ones.
    pub fn settings(&self) -> Option<DispatchSettings> {
        match self.inner.as_ref() {
            HandlerKind::Composed { settings, .. } => Some(*settings),
            HandlerKind::Direct(_) => None,
        }
    }

    /// Dispatch one raw event through this handler.
    ///
    /// For composed handlers: apply the suppression settings, acquire the
    /// instance re-entrancy flag (returning without effect if it is already
    /// held), build the bundle, run the pipeline, and re-emit the result via
    /// the host. The flag is released when the emission returns.
    pub fn handle(&self, event: &dyn RawEvent, data: Value) {
        match self.inner.as_ref() {
            HandlerKind::Direct(listener) => listener(event, data),
            HandlerKind::Composed {
                transform,
                settings,
                shared,
            } => {
                // Suppression runs even when the guard refuses the dispatch.
                if settings.prevent_default {
                    event.prevent_default();
                }
                if settings.stop_propagation {
                    event.stop_propagation();
                }
                let Some(_guard) = TriggerGuard::acquire(&shared.firing) else {
                    trace!(
                        event = event.name(),
                        "proxied trigger already in flight, dropping re-entrant dispatch"
                    );
                    return;
                };
                let Bundle {
                    event: out_event,
                    data: out_data,
                    node: out_node,
                } = transform.apply(Bundle::new(event.name(), data, event.target().clone()));
                shared.host.trigger(&out_node, &out_event, out_data);
            }
        }
    }
}

impl fmt::Debug for ProxyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.as_ref() {
            HandlerKind::Composed { settings, .. } => f
                .debug_struct("ProxyHandler")
                .field("kind", &"composed")
                .field("settings", settings)
                .finish_non_exhaustive(),
            HandlerKind::Direct(_) => f
                .debug_struct("ProxyHandler")
                .field("kind", &"direct")
                .finish_non_exhaustive(),
        }
    }
}

// ── Builder and parts compiler ──────────────────────────────────────────────

/// Typed construction of a composed proxy handler.
///
/// Transforms keep the order they were added in; execution at fire time is
/// right-to-left, so the last transform added runs first. Settings live in
/// their own slot rather than at a magic position, which is why `build`
/// cannot fail.
pub struct ProxyBuilder {
    shared: Arc<ProxyShared>,
    transforms: Vec<Transform>,
    settings: DispatchSettings,
}

impl ProxyBuilder {
    pub(crate) fn new(shared: Arc<ProxyShared>) -> Self {
        Self {
            shared,
            transforms: Vec::new(),
            settings: DispatchSettings::default(),
        }
    }

    /// Append one transform to the pipeline.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Append every transform in `transforms`, preserving their order.
    pub fn transforms<I>(mut self, transforms: I) -> Self
    where
        I: IntoIterator<Item = Transform>,
    {
        self.transforms.extend(transforms);
        self
    }

    /// Replace the fire-time settings wholesale.
    pub fn settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Suppress the raw event's default action at fire time.
    pub fn prevent_default(mut self) -> Self {
        self.settings.prevent_default = true;
        self
    }

    /// Stop the raw event's propagation at fire time.
    pub fn stop_propagation(mut self) -> Self {
        self.settings.stop_propagation = true;
        self
    }

    /// Compose the pipeline and bind the handler to its instance.
    pub fn build(self) -> ProxyHandler {
        ProxyHandler::composed(
            Transform::compose(self.transforms),
            self.settings,
            self.shared,
        )
    }
}

/// Compile an ordered parts list into a composed handler.
///
/// Fails fast on a settings part anywhere but the final position; nothing is
/// built or bound on error.
pub(crate) fn compile<I>(
    shared: Arc<ProxyShared>,
    parts: I,
) -> Result<ProxyHandler, ProxyError>
where
    I: IntoIterator<Item = ProxyPart>,
{
    let parts: Vec<ProxyPart> = parts.into_iter().collect();
    let len = parts.len();
    let mut transforms = Vec::with_capacity(len);
    let mut settings = DispatchSettings::default();
    for (position, part) in parts.into_iter().enumerate() {
        match part {
            ProxyPart::Transform(transform) => transforms.push(transform),
            ProxyPart::Settings(found) if position + 1 == len => settings = found,
            ProxyPart::Settings(_) => {
                return Err(ProxyError::MisplacedSettings { position, len });
            }
        }
    }
    Ok(ProxyHandler::composed(
        Transform::compose(transforms),
        settings,
        shared,
    ))
}
