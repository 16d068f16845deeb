use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::bundle::{Bundle, NodeId};

/// Generates a factory that rewrites exactly one bundle field and leaves the
/// other two untouched.
macro_rules! field_transform {
    ($(#[$attr:meta])* $name:ident, $field:ident, $ty:ty) => {
        $(#[$attr])*
        pub fn $name<F>(f: F) -> Self
        where
            F: Fn($ty) -> $ty + Send + Sync + 'static,
        {
            Self::new(move |mut bundle: Bundle| {
                bundle.$field = f(bundle.$field);
                bundle
            })
        }
    };
}

/// A pure rewrite of an event bundle.
///
/// Transforms take the bundle by value and return the rewritten copy; they
/// must not have effects observable outside the returned value. Cloning is
/// cheap (shared function), and [`Transform::compose`] folds an ordered
/// sequence into a single transform.
#[derive(Clone)]
pub struct Transform {
    inner: Arc<dyn Fn(Bundle) -> Bundle + Send + Sync>,
}

impl Transform {
    /// Wrap a whole-bundle rewrite.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Bundle) -> Bundle + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// The do-nothing transform. Composing an empty sequence yields this.
    pub fn identity() -> Self {
        Self::new(|bundle| bundle)
    }

    field_transform!(
        /// Rewrite only the event name; payload and target pass through.
        map_event,
        event,
        String
    );

    field_transform!(
        /// Rewrite only the payload; event name and target pass through.
        map_data,
        data,
        Value
    );

    field_transform!(
        /// Rewrite only the target; event name and payload pass through.
        map_node,
        node,
        NodeId
    );

    /// Unconditionally rewrite the event name to `name`.
    ///
    /// This is the whole pipeline of a shorthand retarget registration.
    pub fn rename(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::map_event(move |_| name.clone())
    }

    /// Fold an ordered sequence into a single transform.
    ///
    /// Execution is right-to-left over the sequence as given: the last
    /// transform runs first and the first runs last, so earlier transforms
    /// see the output of later ones.
    pub fn compose<I>(transforms: I) -> Self
    where
        I: IntoIterator<Item = Transform>,
    {
        let chain: Vec<Transform> = transforms.into_iter().collect();
        if chain.is_empty() {
            return Self::identity();
        }
        Self::new(move |bundle| chain.iter().rev().fold(bundle, |acc, step| step.apply(acc)))
    }

    /// Run the transform on one bundle.
    pub fn apply(&self, bundle: Bundle) -> Bundle {
        (self.inner)(bundle)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform")
    }
}
