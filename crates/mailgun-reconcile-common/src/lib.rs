//! Managed-resource reconciliation for the Mailgun provider.
//!
//! This crate holds the kind-independent half of the provider:
//!
//! - [`ManagedRecord`] / [`Managed`]: a declared resource and what the core
//!   needs from it
//! - [`ExternalClient`] / [`Connector`]: the per-kind seam
//! - [`Reconciler`]: one pass of Connect, Observe, then Create, Update or
//!   Delete
//! - [`Controller`]: bounded concurrent rounds over many records
//! - [`ConnectionPublisher`] / [`MetricsSink`]: injected collaborators
//!
//! # Pass semantics
//!
//! A pass is level-triggered. It observes the remote resource every time
//! and issues at most one mutating call. A record without an external name
//! is absent without any remote call. Observe treats `NotFound` as absence;
//! every other failure ends the pass with an error and leaves the record's
//! external name untouched.

mod controller;
mod error;
mod external;
mod kind;
mod managed;
mod metrics;
mod publish;
mod reconciler;
mod state;

pub use controller::{Controller, RoundSummary, DEFAULT_MAX_CONCURRENT_RECONCILES};
pub use error::{ReconcileError, ReconcileResult, TransportResultExt};
pub use external::{
    connection_details, ConnectionDetails, Connector, ExternalClient, ExternalCreation,
    ExternalObservation, ExternalUpdate, PassContext,
};
pub use kind::ResourceKind;
pub use managed::{
    Condition, ConditionReason, ConditionType, CredentialRef, ForProvider, Managed,
    ManagedRecord, RecordMeta, RecordSpec, ResourceStatus, SecretKeySelector, SecretReference,
};
pub use metrics::{MetricsSink, NoopMetrics};
pub use publish::{ConnectionPublisher, NoopPublisher};
pub use reconciler::{PassResult, Reconciler};
pub use state::ReconcileState;
