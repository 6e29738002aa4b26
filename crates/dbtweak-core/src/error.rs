//! Core error types.

use std::time::Duration;

use dbtweak_proto::ResourceKind;
use thiserror::Error;

/// Migration engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced attribute, index, collection or document does not exist.
    #[error("{kind} \"{name}\" not found{}", describe_reason(.reason))]
    NotFound {
        /// Kind of the missing resource.
        kind: ResourceKind,
        /// Name of the missing resource.
        name: String,
        /// Human-readable explanation added by the caller.
        reason: Option<String>,
    },

    /// The store reported a failed status while waiting for completion.
    #[error("waiting for completion on {kind} \"{name}\" - failed")]
    CreationFailed {
        /// Kind of the resource.
        kind: ResourceKind,
        /// Name of the resource.
        name: String,
    },

    /// A wait loop did not observe a terminal state before the deadline.
    #[error("gave up waiting for {kind} \"{name}\" after {waited:?}")]
    Timeout {
        /// Kind of the resource.
        kind: ResourceKind,
        /// Name of the resource.
        name: String,
        /// Time spent waiting.
        waited: Duration,
    },

    /// The attribute type cannot be reproduced by the cloner.
    #[error("attribute \"{name}\" has unsupported type \"{type_name}\"")]
    UnsupportedAttribute {
        /// Attribute key.
        name: String,
        /// Type reported by the store.
        type_name: String,
    },

    /// The store rejected a request.
    #[error("store rejected request ({code}): {message}")]
    Store {
        /// Status code returned by the store.
        code: u16,
        /// Message returned by the store.
        message: String,
    },

    /// Network or authentication failure, passed through unmodified.
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid recipe arguments or configuration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

fn describe_reason(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

impl Error {
    /// Create a not-found error without a reason.
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
            reason: None,
        }
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Attach a human-readable reason to a not-found error.
    ///
    /// Other errors are returned unchanged.
    pub fn with_reason(self, reason: impl Into<String>) -> Self {
        match self {
            Error::NotFound { kind, name, .. } => Error::NotFound {
                kind,
                name,
                reason: Some(reason.into()),
            },
            other => other,
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, Error>;
