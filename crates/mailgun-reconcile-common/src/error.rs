//! Error types for reconcile passes.
//!
//! Every remote failure surfaces as [`ReconcileError::Transport`] tagged with
//! the operation that produced it. Only callers that explicitly reinterpret
//! `NotFound` as absence may look inside; everything else is an error.

use mailgun_transport::{BoxError, TransportError};
use thiserror::Error;

/// Result type alias for reconcile operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that end a reconcile pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Credential or configuration resolution failed.
    #[error("Cannot connect: {message}")]
    Connection {
        /// Error message.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// A remote call failed.
    #[error("Cannot {operation}: {source}")]
    Transport {
        /// Operation that issued the call, e.g. "observe route".
        operation: String,
        /// Classified remote failure.
        #[source]
        source: TransportError,
    },

    /// A remote payload could not be decoded.
    #[error("Cannot {operation}: malformed response: {message}")]
    Codec {
        /// Operation that received the payload.
        operation: String,
        /// What was wrong with it.
        message: String,
    },

    /// Removing the previous credential before re-creating it failed.
    #[error("Cannot rotate credential '{login}': {source}")]
    Rotation {
        /// Remote login being rotated.
        login: String,
        /// Failure of the delete-before-recreate call.
        #[source]
        source: TransportError,
    },

    /// Reading or writing the secret store failed.
    #[error("Secret store: {message}")]
    SecretStore {
        /// Error message.
        message: String,
    },

    /// The record handed to a client does not match it.
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl ReconcileError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error tagged with its operation.
    pub fn transport(operation: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            operation: operation.into(),
            source,
        }
    }

    /// Creates a codec error.
    pub fn codec(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codec {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a rotation error.
    pub fn rotation(login: impl Into<String>, source: TransportError) -> Self {
        Self::Rotation {
            login: login.into(),
            source,
        }
    }

    /// Creates a secret store error.
    pub fn secret_store(message: impl Into<String>) -> Self {
        Self::SecretStore {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the remote failure, if this error came from a remote call.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport { source, .. } | Self::Rotation { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns true if the pass was abandoned because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.transport_error()
            .map(TransportError::is_cancelled)
            .unwrap_or(false)
    }

    /// Short stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Transport { source, .. } => source.kind(),
            Self::Codec { .. } => "codec",
            Self::Rotation { .. } => "rotation",
            Self::SecretStore { .. } => "secret_store",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Tags transport results with the operation that produced them.
pub trait TransportResultExt<T> {
    /// Wraps an error as [`ReconcileError::Transport`] for `operation`.
    fn during(self, operation: impl Into<String>) -> ReconcileResult<T>;
}

impl<T> TransportResultExt<T> for Result<T, TransportError> {
    fn during(self, operation: impl Into<String>) -> ReconcileResult<T> {
        self.map_err(|e| ReconcileError::transport(operation, e))
    }
}
