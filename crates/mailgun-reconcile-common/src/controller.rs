//! Bounded concurrent reconcile rounds.

use futures::stream::{self, StreamExt};
use tracing::info;

use crate::external::PassContext;
use crate::managed::Managed;
use crate::reconciler::{PassResult, Reconciler};

/// Default number of passes allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: usize = 8;

/// Results of one round, in record order.
#[derive(Debug, Default)]
pub struct RoundSummary {
    /// One result per record.
    pub passes: Vec<PassResult>,
}

impl RoundSummary {
    /// Number of passes that succeeded.
    pub fn succeeded(&self) -> usize {
        self.passes.iter().filter(|p| p.is_ok()).count()
    }

    /// Number of passes that failed.
    pub fn failed(&self) -> usize {
        self.passes.len() - self.succeeded()
    }
}

/// Runs one pass per record, a bounded number at a time.
///
/// Each record is borrowed mutably by exactly one pass, so passes over the
/// same record can never overlap.
pub struct Controller<R: Managed> {
    reconciler: Reconciler<R>,
    max_concurrent: usize,
}

impl<R: Managed + 'static> Controller<R> {
    /// Creates a controller.
    pub fn new(reconciler: Reconciler<R>) -> Self {
        Self {
            reconciler,
            max_concurrent: DEFAULT_MAX_CONCURRENT_RECONCILES,
        }
    }

    /// Sets the concurrency bound. Zero is treated as one.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Returns the concurrency bound.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Reconciler used for each pass.
    pub fn reconciler(&self) -> &Reconciler<R> {
        &self.reconciler
    }

    /// Reconciles every record once.
    pub async fn run_round(&self, ctx: &PassContext, records: &mut [R]) -> RoundSummary {
        let reconciler = &self.reconciler;
        let passes: Vec<PassResult> = stream::iter(records.iter_mut())
            .map(|record| reconciler.reconcile(ctx, record))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let summary = RoundSummary { passes };
        info!(
            records = summary.passes.len(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Reconcile round complete"
        );
        summary
    }
}
