//! A provider wired to in-memory collaborators.

use std::sync::Arc;

use mailgun_provider::{ProviderConnector, Resource, SecretStorePublisher, TracingMetrics};
use mailgun_reconcile_common::{Controller, PassContext, PassResult, Reconciler, RoundSummary};
use mailgun_transport::{CancellationToken, Region};

use crate::fake::FakeMailgun;
use crate::fixtures::API_KEY;
use crate::{MemorySecretStore, StaticCredentialResolver};

/// Reconciler over a [`FakeMailgun`], a [`MemorySecretStore`] and a single
/// `default` account keyed with [`API_KEY`].
pub struct ProviderHarness {
    pub fake: FakeMailgun,
    pub secrets: Arc<MemorySecretStore>,
    pub metrics: Arc<TracingMetrics>,
    pub cancel: CancellationToken,
    controller: Controller<Resource>,
}

impl ProviderHarness {
    pub fn new() -> Self {
        Self::with_resolver(StaticCredentialResolver::single(API_KEY, Region::Us))
    }

    /// Harness whose accounts come from `resolver`. The fake still only
    /// accepts [`API_KEY`].
    pub fn with_resolver(resolver: StaticCredentialResolver) -> Self {
        let fake = FakeMailgun::new().with_api_key(API_KEY);
        let secrets = Arc::new(MemorySecretStore::new());
        let metrics = Arc::new(TracingMetrics::new());

        let connector = ProviderConnector::new(
            Arc::new(resolver),
            Arc::new(fake.clone()),
            secrets.clone(),
        );
        let reconciler = Reconciler::new(Arc::new(connector))
            .with_publisher(Arc::new(SecretStorePublisher::new(secrets.clone())))
            .with_metrics(metrics.clone());

        Self {
            fake,
            secrets,
            metrics,
            cancel: CancellationToken::new(),
            controller: Controller::new(reconciler),
        }
    }

    /// Sets the concurrency bound of [`run_round`](Self::run_round).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.controller = self.controller.with_max_concurrent(max_concurrent);
        self
    }

    fn context(&self) -> PassContext {
        PassContext::with_cancel(self.cancel.clone())
    }

    /// Runs one pass over `record`.
    pub async fn reconcile(&self, record: &mut Resource) -> PassResult {
        self.controller.reconciler().reconcile(&self.context(), record).await
    }

    /// Runs passes until one makes no mutating call, up to `max_passes`.
    pub async fn converge(&self, record: &mut Resource, max_passes: usize) -> Vec<PassResult> {
        let mut passes = Vec::new();
        for _ in 0..max_passes {
            let pass = self.reconcile(record).await;
            let settled = !pass.state.is_mutating() || !pass.is_ok();
            passes.push(pass);
            if settled {
                break;
            }
        }
        passes
    }

    /// Runs one controller round over `records`.
    pub async fn run_round(&self, records: &mut [Resource]) -> RoundSummary {
        self.controller.run_round(&self.context(), records).await
    }
}

impl Default for ProviderHarness {
    fn default() -> Self {
        Self::new()
    }
}
