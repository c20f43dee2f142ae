//! Crate-level error types for remote calls, session wiring, and the
//! notification bridge.

use serde::{Deserialize, Serialize};

/// Error code a remote service uses when the requested entity does not exist.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Generic code used when a response body could not be decoded as a
/// structured failure.
pub const SYSTEM_ERROR: &str = "SYSTEM_ERROR";

/// The `Fail` arm of a remote call: a structured error code plus the
/// parameters used to render it.
///
/// Produced by remote collaborators and folded into `last_failure` by
/// action handlers. Handlers never propagate it past their own boundary.
///
/// # Examples
///
/// ```
/// use opstate::{FailureClass, RemoteFailure};
///
/// let failure = RemoteFailure::new("DUPLICATE_CODE");
/// assert_eq!(failure.class(), FailureClass::Remote);
/// assert!(failure.parameters.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("remote call failed: {code}")]
pub struct RemoteFailure {
    /// Machine-readable error code (e.g. `"DUPLICATE_CODE"`).
    pub code: String,
    /// Values substituted into the rendered message.
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Coarse classification of a [`RemoteFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// A structured failure reported by the remote service.
    Remote,
    /// The remote service reported that the entity does not exist.
    ///
    /// Several lookups treat this as an empty result instead of a failure.
    NotFound,
    /// The response could not be decoded; wrapped with [`SYSTEM_ERROR`].
    System,
}

impl RemoteFailure {
    /// Build a failure with no parameters.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            parameters: Vec::new(),
        }
    }

    /// Build a failure carrying render parameters.
    ///
    /// # Arguments
    ///
    /// * `code` - Machine-readable error code.
    /// * `parameters` - Values substituted into the rendered message.
    pub fn with_parameters<I, P>(code: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            code: code.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// A [`NOT_FOUND`] failure.
    pub fn not_found() -> Self {
        Self::new(NOT_FOUND)
    }

    /// A [`SYSTEM_ERROR`] failure wrapping a raw, undecodable body.
    pub fn system(body: impl Into<String>) -> Self {
        Self::with_parameters(SYSTEM_ERROR, [body.into()])
    }

    /// Classify this failure by its code.
    pub fn class(&self) -> FailureClass {
        match self.code.as_str() {
            NOT_FOUND => FailureClass::NotFound,
            SYSTEM_ERROR => FailureClass::System,
            _ => FailureClass::Remote,
        }
    }

    /// Shorthand for `self.class() == FailureClass::NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.class() == FailureClass::NotFound
    }
}

/// Error returned when looking up or registering slices on a
/// [`Session`](crate::Session).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No container was registered for the requested slice.
    #[error("slice '{slice}' is not registered with this session")]
    NotRegistered {
        /// Name of the requested slice.
        slice: &'static str,
    },

    /// A slice was registered twice on the same builder.
    #[error("slice '{slice}' is already registered")]
    AlreadyRegistered {
        /// Name of the duplicated slice.
        slice: &'static str,
    },
}

/// Error returned when stopping a notification bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The bridge task panicked or was aborted before it could stop cleanly.
    #[error("notification bridge task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
