use thiserror::Error;

/// Configuration errors raised while building or registering proxies.
///
/// Every variant is synchronous and fatal to the construction that raised it:
/// no partially-built handler or registration is ever exposed. Misconfigured
/// wiring fails here, at setup time, not at first event fire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    /// An execution-settings part appeared anywhere but the final position of
    /// a proxy parts list.
    #[error("execution settings must be the final proxy part (found at position {position} of {len})")]
    MisplacedSettings {
        /// Zero-based position of the offending settings part.
        position: usize,
        /// Total length of the parts list.
        len: usize,
    },

    /// A shorthand registration was given an empty source or target event
    /// name, which would corrupt the registry key.
    #[error("event name must not be empty")]
    EmptyEventName,
}
