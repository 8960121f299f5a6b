//! One reconcile pass: Connect, Observe, then at most one of Create, Update
//! or Delete.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::error::{ReconcileError, ReconcileResult};
use crate::external::{ConnectionDetails, Connector, ExternalClient, PassContext};
use crate::managed::{Condition, Managed};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::publish::{ConnectionPublisher, NoopPublisher};
use crate::state::ReconcileState;

/// Outcome of one reconcile pass, handed back to the caller.
#[derive(Debug)]
pub struct PassResult {
    /// Last state the pass reached.
    pub state: ReconcileState,
    /// The remote resource existed when observed.
    pub resource_exists: bool,
    /// The remote resource matched the declaration when observed.
    pub resource_up_to_date: bool,
    /// Connection details produced by the pass.
    pub connection_details: ConnectionDetails,
    /// Remote identifier to persist on the record.
    pub external_name: Option<String>,
    /// Error that ended the pass, if any.
    pub error: Option<ReconcileError>,
}

impl PassResult {
    fn unconnected() -> Self {
        Self {
            state: ReconcileState::Unconnected,
            resource_exists: false,
            resource_up_to_date: false,
            connection_details: ConnectionDetails::new(),
            external_name: None,
            error: None,
        }
    }

    /// Returns true if the pass finished without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives reconcile passes for records of type `R`.
///
/// Holds no per-record state; every pass connects afresh.
pub struct Reconciler<R: Managed> {
    connector: Arc<dyn Connector<R>>,
    publisher: Arc<dyn ConnectionPublisher>,
    metrics: Arc<dyn MetricsSink>,
}

impl<R: Managed + 'static> Reconciler<R> {
    /// Creates a reconciler that publishes nothing and records no metrics.
    pub fn new(connector: Arc<dyn Connector<R>>) -> Self {
        Self {
            connector,
            publisher: Arc::new(NoopPublisher),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Sets the connection-detail publisher.
    pub fn with_publisher(mut self, publisher: Arc<dyn ConnectionPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Sets the metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Runs one pass over `record`, writing back its external name and
    /// conditions.
    ///
    /// Never panics and never swallows an error: a failed pass returns its
    /// error in [`PassResult::error`] and marks the record not synced.
    #[instrument(skip_all, fields(kind = %record.kind(), name = %record.name()))]
    pub async fn reconcile(&self, ctx: &PassContext, record: &mut R) -> PassResult {
        let started = Instant::now();
        let mut pass = PassResult::unconnected();

        match self.run(ctx, record, &mut pass).await {
            Ok(()) => {
                record.set_condition(Condition::reconcile_success());
                debug!(state = %pass.state, "Pass complete");
            }
            Err(e) => {
                warn!(state = %pass.state, error = %e, kind_label = e.kind(), "Pass failed");
                record.set_condition(Condition::reconcile_error(e.to_string()));
                pass.error = Some(e);
            }
        }

        pass.external_name = record.external_name().map(str::to_string);
        self.metrics
            .record_pass(record.kind(), pass.state, pass.is_ok(), started.elapsed());
        pass
    }

    async fn run(&self, ctx: &PassContext, record: &mut R, pass: &mut PassResult) -> ReconcileResult<()> {
        let client = self.connector.connect(ctx, record).await?;
        pass.state = ReconcileState::Connected;

        let observation = client.observe(ctx, record).await;
        self.track("observe", record, &observation);
        let observation = observation?;

        pass.state = ReconcileState::observed(
            observation.resource_exists,
            observation.resource_up_to_date,
        );
        pass.resource_exists = observation.resource_exists;
        pass.resource_up_to_date = observation.resource_up_to_date;

        if record.deletion_requested() {
            return self.delete(ctx, client.as_ref(), record, pass).await;
        }

        self.publish(record, &observation.connection_details, pass).await?;

        match pass.state {
            ReconcileState::ObservedAbsent => {
                pass.state = ReconcileState::Creating;
                record.set_condition(Condition::creating());

                let creation = client.create(ctx, record).await;
                self.track("create", record, &creation);
                let creation = creation?;

                if let Some(external_name) = creation.external_name {
                    info!(external_name = %external_name, "Created remote resource");
                    record.set_external_name(external_name);
                }
                self.publish(record, &creation.connection_details, pass).await
            }
            ReconcileState::ObservedPresentStale => {
                pass.state = ReconcileState::Updating;

                let update = client.update(ctx, record).await;
                self.track("update", record, &update);
                let update = update?;

                info!("Updated remote resource");
                record.set_condition(Condition::available());
                self.publish(record, &update.connection_details, pass).await
            }
            _ => {
                record.set_condition(Condition::available());
                Ok(())
            }
        }
    }

    async fn delete(
        &self,
        ctx: &PassContext,
        client: &dyn ExternalClient<R>,
        record: &mut R,
        pass: &mut PassResult,
    ) -> ReconcileResult<()> {
        record.set_condition(Condition::deleting());

        // Some kinds observe absence without asking the remote. A known
        // remote identifier is always deleted.
        if pass.resource_exists || record.external_name().is_some() {
            pass.state = ReconcileState::Deleting;
            let deleted = client.delete(ctx, record).await;
            self.track("delete", record, &deleted);
            deleted?;
            info!("Deleted remote resource");
        }

        if let Some(secret) = record.connection_secret_ref() {
            self.publisher.unpublish(secret).await?;
        }
        Ok(())
    }

    async fn publish(
        &self,
        record: &R,
        details: &ConnectionDetails,
        pass: &mut PassResult,
    ) -> ReconcileResult<()> {
        if details.is_empty() {
            return Ok(());
        }
        pass.connection_details
            .extend(details.iter().map(|(k, v)| (k.clone(), v.clone())));

        match record.connection_secret_ref() {
            Some(secret) => self.publisher.publish(secret, details).await,
            None => Ok(()),
        }
    }

    fn track<T>(&self, verb: &str, record: &R, result: &ReconcileResult<T>) {
        let operation = format!("{} {}", verb, record.kind());
        self.metrics.record_remote_call(&operation, result.is_ok());
    }
}
