//! Resilient transport for the Mailgun API.
//!
//! This crate executes authenticated, form-encoded calls against the Mailgun
//! REST API and hands back decoded JSON:
//!
//! - [`Transport`]: the seam every resource client calls through
//! - [`HttpTransport`]: reqwest implementation with region selection,
//!   basic auth, per-attempt timeout and retry
//! - [`TransportError`]: the failure taxonomy callers match on
//! - [`RetryPolicy`]: capped exponential backoff, cancellation-aware
//! - [`FormBody`] / [`form!`]: ordered, repeatable form fields
//!
//! # Retry semantics
//!
//! Only `ServiceUnavailable` (502/503/504, connect errors, timeouts) and
//! `RateLimited` (429) are retried. Everything else is returned on the first
//! attempt. The request body is encoded once, before the first attempt, and
//! every attempt sends an identical copy of it.
//!
//! # Example
//!
//! ```ignore
//! use mailgun_transport::{form, ApiRequest, ClientConfig, HttpTransport, Region, Transport};
//! use tokio_util::sync::CancellationToken;
//!
//! let transport = HttpTransport::new(ClientConfig::new(api_key, Region::Eu))?;
//! let request = ApiRequest::post(["v3", "routes"])
//!     .with_form(form! { "expression" => "catch_all()", "action" => "stop()" });
//! let payload = transport.execute(request, &CancellationToken::new()).await?;
//! ```

mod client;
mod config;
mod error;
mod form;
mod request;
mod retry;

pub use client::{parse_retry_after, HttpTransport, Transport};
pub use config::{
    ClientConfig, Region, API_USER, DEFAULT_REQUEST_TIMEOUT, EU_BASE_URL, EU_SMTP_ENDPOINT,
    SMTP_PORT, US_BASE_URL, US_SMTP_ENDPOINT,
};
pub use error::{BoxError, TransportError, TransportResult};
pub use form::{FormBody, FormField};
pub use request::{ApiRequest, Method};
pub use retry::{
    RetryPolicy, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF,
    DEFAULT_MAX_RATE_LIMIT_WAIT, DEFAULT_RATE_LIMIT_FALLBACK,
};

// Re-exported so callers of `Transport::execute` need not depend on tokio-util.
pub use tokio_util::sync::CancellationToken;
