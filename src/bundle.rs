use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque reference to an addressable emission target.
///
/// The proxy layer never interprets the identifier; hosts decide what it
/// addresses (an interface element, an entity, a channel).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One in-flight event record travelling through a transform pipeline.
///
/// A bundle is created fresh from the raw event at each proxy invocation and
/// does not outlive the dispatch that created it. Transforms receive it by
/// value and hand back the rewritten copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Event-name identifier, rewritten by retargeting transforms.
    pub event: String,
    /// Arbitrary payload, carried opaquely unless a transform touches it.
    pub data: Value,
    /// Emission target, preserved from the raw event unless rewritten.
    pub node: NodeId,
}

impl Bundle {
    pub fn new(event: impl Into<String>, data: Value, node: NodeId) -> Self {
        Self {
            event: event.into(),
            data,
            node,
        }
    }
}
