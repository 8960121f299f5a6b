//! The per-kind seam the reconciler drives.
//!
//! Every resource kind implements [`ExternalClient`] identically: the
//! reconciler only ever sees observations, creations and updates, never the
//! kind-specific payloads behind them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mailgun_transport::CancellationToken;

use crate::error::ReconcileResult;
use crate::managed::Managed;

/// Opaque connection output, published to the record's connection secret.
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// Per-pass execution context supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct PassContext {
    /// Cancels every remote call of the pass, including pending retries.
    pub cancel: CancellationToken,
}

impl PassContext {
    /// Creates a context with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context driven by the given token.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Returns true if the pass was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Result of observing the remote resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    /// The remote resource exists.
    pub resource_exists: bool,
    /// The remote resource matches the declaration.
    pub resource_up_to_date: bool,
    /// Connection details derived from the observation.
    pub connection_details: ConnectionDetails,
}

impl ExternalObservation {
    /// The remote resource does not exist.
    pub fn absent() -> Self {
        Self::default()
    }

    /// The remote resource exists; `up_to_date` is the comparator verdict.
    pub fn present(up_to_date: bool) -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            connection_details: ConnectionDetails::new(),
        }
    }

    /// Attaches connection details.
    pub fn with_connection_details(mut self, details: ConnectionDetails) -> Self {
        self.connection_details = details;
        self
    }
}

/// Result of creating the remote resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCreation {
    /// Remote identifier to persist on the record.
    pub external_name: Option<String>,
    /// Connection details disclosed at creation.
    pub connection_details: ConnectionDetails,
}

impl ExternalCreation {
    /// Creation that assigned `external_name`.
    pub fn named(external_name: impl Into<String>) -> Self {
        Self {
            external_name: Some(external_name.into()),
            connection_details: ConnectionDetails::new(),
        }
    }

    /// Attaches connection details.
    pub fn with_connection_details(mut self, details: ConnectionDetails) -> Self {
        self.connection_details = details;
        self
    }
}

/// Result of updating the remote resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalUpdate {
    /// Connection details changed by the update.
    pub connection_details: ConnectionDetails,
}

/// Remote operations for one kind of record, bound to one transport.
///
/// Implementations write the observed remote state into the record's status
/// and never touch its external name; the reconciler assigns that from
/// [`ExternalCreation::external_name`].
#[async_trait]
pub trait ExternalClient<R: Managed>: Send + Sync {
    /// Reads the remote resource and compares it against the declaration.
    ///
    /// `NotFound` is absence. Every other remote failure is an error.
    async fn observe(&self, ctx: &PassContext, record: &mut R)
        -> ReconcileResult<ExternalObservation>;

    /// Creates the remote resource. Safe to call again after a failure.
    async fn create(&self, ctx: &PassContext, record: &mut R) -> ReconcileResult<ExternalCreation>;

    /// Brings the remote resource in line with the declaration.
    async fn update(&self, ctx: &PassContext, record: &mut R) -> ReconcileResult<ExternalUpdate>;

    /// Deletes the remote resource. `NotFound` is success.
    async fn delete(&self, ctx: &PassContext, record: &R) -> ReconcileResult<()>;
}

/// Resolves a record's credentials into a bound [`ExternalClient`].
#[async_trait]
pub trait Connector<R: Managed>: Send + Sync {
    /// Builds a client for `record`. Issues no remote calls.
    async fn connect(
        &self,
        ctx: &PassContext,
        record: &R,
    ) -> ReconcileResult<Box<dyn ExternalClient<R>>>;
}

/// Helper to build connection details from string pairs.
pub fn connection_details<K, V, I>(pairs: I) -> ConnectionDetails
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<[u8]>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.as_ref().to_vec()))
        .collect()
}
