//! Metrics sink that logs measurements and keeps running totals.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mailgun_reconcile_common::{MetricsSink, ReconcileState, ResourceKind};
use tracing::{debug, warn};

/// Running totals since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub passes: u64,
    pub failed_passes: u64,
    pub remote_calls: u64,
    pub failed_remote_calls: u64,
}

/// Emits one tracing event per measurement.
#[derive(Debug, Default)]
pub struct TracingMetrics {
    passes: AtomicU64,
    failed_passes: AtomicU64,
    remote_calls: AtomicU64,
    failed_remote_calls: AtomicU64,
}

impl TracingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            failed_passes: self.failed_passes.load(Ordering::Relaxed),
            remote_calls: self.remote_calls.load(Ordering::Relaxed),
            failed_remote_calls: self.failed_remote_calls.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for TracingMetrics {
    fn record_pass(&self, kind: ResourceKind, state: ReconcileState, ok: bool, elapsed: Duration) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failed_passes.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            kind = %kind,
            state = %state,
            ok,
            elapsed_ms = elapsed.as_millis() as u64,
            "Reconcile pass finished"
        );
    }

    fn record_remote_call(&self, operation: &str, ok: bool) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        if ok {
            debug!(operation, "Remote call succeeded");
        } else {
            self.failed_remote_calls.fetch_add(1, Ordering::Relaxed);
            warn!(operation, "Remote call failed");
        }
    }
}
