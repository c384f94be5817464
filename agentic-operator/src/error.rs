//! Error types for the Agentic Kubernetes operator.

use thiserror::Error;

/// Errors that can occur during operator operations.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Kubernetes API error.
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Resource not found.
    #[error("Resource not found: {kind}/{name} in namespace {namespace}")]
    NotFound {
        /// Resource kind.
        kind: String,
        /// Resource name.
        name: String,
        /// Resource namespace.
        namespace: String,
    },

    /// Agent spec failed validation.
    #[error("Spec validation failed: {0}")]
    InvalidSpec(String),

    /// Referenced credential key is absent from the Secret.
    #[error("Key {key} not found in secret {secret}")]
    MissingSecretKey {
        /// Secret name.
        secret: String,
        /// Missing key.
        key: String,
    },

    /// Invalid operator configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for operator operations.
pub type OperatorResult<T> = Result<T, OperatorError>;

impl From<serde_json::Error> for OperatorError {
    fn from(err: serde_json::Error) -> Self {
        OperatorError::SerializationError(err.to_string())
    }
}

impl OperatorError {
    /// True when the error reflects a terminal precondition the user must
    /// fix (an invalid spec, a missing secret or secret key). Terminal
    /// errors are surfaced through the Agent's status instead of the work
    /// queue's backoff.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperatorError::InvalidSpec(_)
                | OperatorError::MissingSecretKey { .. }
                | OperatorError::NotFound { .. }
        )
    }
}
