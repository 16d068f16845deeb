#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::return_self_not_must_use
)]

//! Event transformation and rebroadcast layer.
//!
//! `recast` lets a component listen for an event, push it through a pipeline
//! of pure transforms, and re-emit the result as a different event, with a
//! different name, payload, or target, while suppressing the recursive
//! re-triggering that naive subscribe-and-re-emit wiring produces.
//!
//! ```text
//!   raw event ──► ProxyHandler ──► suppression hooks ──► re-entrancy guard
//!                                                              │
//!            EventHost::trigger ◄── transform pipeline ◄── Bundle
//! ```
//!
//! The host side of the boundary is two traits: [`EventHost`] (subscribe,
//! unsubscribe, trigger) and [`RawEvent`] (the event value a host hands to a
//! firing handler). [`LocalBus`] is a synchronous in-memory host for tests
//! and simple in-process wiring; anything that satisfies the traits can take
//! its place.
//!
//! Handlers are built per [`EventProxy`] instance, either through the typed
//! [`ProxyBuilder`] or by compiling an ordered [`ProxyPart`] list. All
//! composed handlers of one instance share a single re-entrancy flag, so a
//! proxied emission can never recursively fire another proxy of the same
//! instance.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use recast::{EventProxy, LocalBus, NodeId, ProxyHandler};
//! use serde_json::json;
//!
//! let bus = Arc::new(LocalBus::new());
//! let proxy = EventProxy::new(bus.clone());
//! let node = NodeId::new("search-box");
//!
//! // Re-emit every `submit` on the node as `search-requested`.
//! proxy.proxy_retarget(&node, "submit", "search-requested")?;
//!
//! // An ordinary listener on the re-emitted event.
//! let hits = Arc::new(AtomicUsize::new(0));
//! let sink = hits.clone();
//! proxy.proxy_handler(
//!     &node,
//!     "search-requested",
//!     ProxyHandler::from_fn(move |_, data| {
//!         assert_eq!(data, json!({"q": "rust"}));
//!         sink.fetch_add(1, Ordering::Relaxed);
//!     }),
//! );
//!
//! bus.dispatch(&node, "submit", json!({"q": "rust"}));
//! assert_eq!(hits.load(Ordering::Relaxed), 1);
//! # Ok::<(), recast::ProxyError>(())
//! ```

pub mod bundle;
pub mod bus;
pub mod error;
pub mod handler;
pub mod host;
pub mod registry;
pub mod transform;

pub use bundle::{Bundle, NodeId};
pub use bus::{BusEvent, DispatchOutcome, LocalBus};
pub use error::ProxyError;
pub use handler::{DispatchSettings, ProxyBuilder, ProxyHandler, ProxyPart};
pub use host::{EventHost, RawEvent};
pub use registry::{EventProxy, ProxyHandle};
pub use transform::Transform;
