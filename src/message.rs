//! User-facing messages derived from operation outcomes.

use serde::{Deserialize, Serialize};

use crate::error::RemoteFailure;

/// Severity of a [`Message`]. Presentation code picks the toast style
/// from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Error,
    Success,
}

/// A renderable message: a translation key, its kind, and the parameters
/// substituted into the translated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Translation key (for failures, the remote error code).
    pub key: String,
    /// Severity.
    pub kind: MessageKind,
    /// Substitution parameters.
    pub parameters: Vec<String>,
}

impl Message {
    /// An error message with the given key and no parameters.
    pub fn error(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: MessageKind::Error,
            parameters: Vec::new(),
        }
    }

    /// A success message with the given key and no parameters.
    pub fn success(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: MessageKind::Success,
            parameters: Vec::new(),
        }
    }

    /// Attach substitution parameters.
    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

impl From<RemoteFailure> for Message {
    fn from(failure: RemoteFailure) -> Self {
        Message::error(failure.code).with_parameters(failure.parameters)
    }
}

impl From<&RemoteFailure> for Message {
    fn from(failure: &RemoteFailure) -> Self {
        Message::from(failure.clone())
    }
}
