//! Error taxonomy for remote API calls.
//!
//! Every failed request is classified into one [`TransportError`] variant.
//! Callers match on the variant, never on status codes or message text.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Boxed underlying cause carried by some variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Mailgun reports bad parameters as `'address' parameter is not a valid address`.
static PARAMETER_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'([A-Za-z_][A-Za-z0-9_\-]*)' parameter").expect("valid regex"));

/// Classified failure of a remote call.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The addressed resource does not exist (404).
    #[error("Resource not found: {message}")]
    NotFound {
        /// Server-provided message.
        message: String,
    },

    /// The request conflicts with existing remote state (409).
    #[error("Conflict: {message}")]
    Conflict {
        /// Server-provided message.
        message: String,
    },

    /// The remote service throttled the request (429).
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay requested by the server, or the configured fallback.
        retry_after: Duration,
    },

    /// The remote service or the network path to it is temporarily unavailable
    /// (502/503/504, connect failures, timeouts).
    #[error("Service unavailable{}: {message}", status_suffix(*status))]
    ServiceUnavailable {
        /// HTTP status, absent for network-level failures.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// The API key was rejected (401).
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Server-provided message.
        message: String,
    },

    /// The request was rejected as invalid (400/422).
    #[error("Invalid {}: {reason}", field.as_deref().unwrap_or("request"))]
    Validation {
        /// Offending parameter, when the server names one.
        field: Option<String>,
        /// Server-provided reason.
        reason: String,
    },

    /// The caller cancelled the request before it completed.
    #[error("Request cancelled")]
    Cancelled,

    /// Anything else, including undecodable responses.
    #[error("Unexpected response{}: {message}", status_suffix(*status))]
    Unknown {
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },
}

fn status_suffix(status: Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl TransportError {
    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a rate-limited error.
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Creates a service-unavailable error without an underlying cause.
    pub fn service_unavailable(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a validation error, extracting the parameter name from the
    /// message when the server names one.
    pub fn validation(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let field = PARAMETER_FIELD
            .captures(&reason)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        Self::Validation { field, reason }
    }

    /// Creates an unknown error without an underlying cause.
    pub fn unknown(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Unknown {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Classifies an HTTP error status.
    ///
    /// `retry_after` is only consulted for 429 and must already have the
    /// fallback applied.
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Duration) -> Self {
        let message = message.into();
        match status {
            401 => Self::authentication(message),
            404 => Self::not_found(message),
            409 => Self::conflict(message),
            429 => Self::rate_limited(retry_after),
            400 | 422 => Self::validation(message),
            502..=504 => Self::service_unavailable(Some(status), message),
            _ => Self::unknown(Some(status), message),
        }
    }

    /// Returns true for the variants the transport retries internally.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::ServiceUnavailable { .. } | TransportError::RateLimited { .. }
        )
    }

    /// Returns true if the resource is absent remotely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }

    /// Returns true if the request was abandoned because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }

    /// Short stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::NotFound { .. } => "not_found",
            TransportError::Conflict { .. } => "conflict",
            TransportError::RateLimited { .. } => "rate_limited",
            TransportError::ServiceUnavailable { .. } => "service_unavailable",
            TransportError::Authentication { .. } => "authentication",
            TransportError::Validation { .. } => "validation",
            TransportError::Cancelled => "cancelled",
            TransportError::Unknown { .. } => "unknown",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            TransportError::ServiceUnavailable {
                status: None,
                message: err.to_string(),
                source: Some(Box::new(err)),
            }
        } else {
            TransportError::Unknown {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
                source: Some(Box::new(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: Duration = Duration::from_secs(5);

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            TransportError::from_status(401, "Forbidden", FALLBACK),
            TransportError::Authentication { .. }
        ));
        assert!(TransportError::from_status(404, "Not found", FALLBACK).is_not_found());
        assert!(matches!(
            TransportError::from_status(409, "exists", FALLBACK),
            TransportError::Conflict { .. }
        ));
        for status in [502, 503, 504] {
            assert!(matches!(
                TransportError::from_status(status, "down", FALLBACK),
                TransportError::ServiceUnavailable { status: Some(s), .. } if s == status
            ));
        }
        assert!(matches!(
            TransportError::from_status(500, "boom", FALLBACK),
            TransportError::Unknown { status: Some(500), .. }
        ));
        assert!(matches!(
            TransportError::from_status(403, "nope", FALLBACK),
            TransportError::Unknown { status: Some(403), .. }
        ));
    }

    #[test]
    fn test_rate_limited_carries_delay() {
        match TransportError::from_status(429, "slow down", Duration::from_secs(7)) {
            TransportError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(7))
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_field_extraction() {
        match TransportError::validation("'address' parameter is not a valid address") {
            TransportError::Validation { field, reason } => {
                assert_eq!(field.as_deref(), Some("address"));
                assert!(reason.contains("not a valid address"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }

        match TransportError::validation("Domain name is required") {
            TransportError::Validation { field, .. } => assert_eq!(field, None),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TransportError::service_unavailable(Some(503), "x").is_retryable());
        assert!(TransportError::rate_limited(FALLBACK).is_retryable());
        assert!(!TransportError::not_found("x").is_retryable());
        assert!(!TransportError::conflict("x").is_retryable());
        assert!(!TransportError::authentication("x").is_retryable());
        assert!(!TransportError::validation("x").is_retryable());
        assert!(!TransportError::Cancelled.is_retryable());
        assert!(!TransportError::unknown(Some(500), "x").is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TransportError::service_unavailable(Some(503), "maintenance").to_string(),
            "Service unavailable (HTTP 503): maintenance"
        );
        assert_eq!(
            TransportError::validation("'priority' parameter must be a number").to_string(),
            "Invalid priority: 'priority' parameter must be a number"
        );
        assert_eq!(TransportError::Cancelled.to_string(), "Request cancelled");
    }
}
