//! Observability sink injected into the reconciler.

use std::time::Duration;

use crate::kind::ResourceKind;
use crate::state::ReconcileState;

/// Receives per-pass and per-call measurements.
///
/// The process installs one sink at startup and hands it to every
/// [`Reconciler`](crate::Reconciler); the reconcile core never builds one.
pub trait MetricsSink: Send + Sync {
    /// One reconcile pass finished.
    fn record_pass(&self, kind: ResourceKind, state: ReconcileState, ok: bool, elapsed: Duration);

    /// One remote operation (observe, create, update, delete) finished.
    fn record_remote_call(&self, operation: &str, ok: bool);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_pass(&self, _: ResourceKind, _: ReconcileState, _: bool, _: Duration) {}

    fn record_remote_call(&self, _: &str, _: bool) {}
}
