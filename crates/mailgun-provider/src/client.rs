//! Generic external client for every readable kind.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use mailgun_reconcile_common::{
    ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate, ForProvider, Managed,
    PassContext, ReconcileError, ReconcileResult, TransportResultExt,
};
use mailgun_transport::Transport;
use tracing::{debug, instrument};

use crate::resources::{KindRecord, RemoteResource};

/// Drives one [`RemoteResource`] kind through a shared [`Transport`].
pub struct ResourceClient<K> {
    transport: Arc<dyn Transport>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: RemoteResource> ResourceClient<K> {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            _kind: PhantomData,
        }
    }

    fn operation(verb: &str) -> String {
        format!("{} {}", verb, <K::Params as ForProvider>::KIND)
    }
}

fn require_external_name<'a>(record: &'a impl Managed, verb: &str) -> ReconcileResult<&'a str> {
    record.external_name().ok_or_else(|| {
        ReconcileError::internal(format!(
            "cannot {} {} '{}' without an external name",
            verb,
            record.kind(),
            record.name()
        ))
    })
}

#[async_trait]
impl<K: RemoteResource> ExternalClient<KindRecord<K>> for ResourceClient<K> {
    #[instrument(skip_all, fields(name = %record.metadata.name))]
    async fn observe(
        &self,
        ctx: &PassContext,
        record: &mut KindRecord<K>,
    ) -> ReconcileResult<ExternalObservation> {
        let operation = Self::operation("observe");

        let Some(external_name) = record.external_name() else {
            debug!("No external name, resource is absent");
            return Ok(ExternalObservation::absent());
        };

        let request = K::get_request(record.params(), external_name);
        let payload = match self.transport.execute(request, &ctx.cancel).await {
            Ok(payload) => payload,
            Err(e) if e.is_not_found() => {
                debug!("Remote resource not found");
                record.status.at_provider = None;
                return Ok(ExternalObservation::absent());
            }
            Err(e) => return Err(ReconcileError::transport(operation, e)),
        };

        let observed = K::to_observation(&payload).map_err(|m| ReconcileError::codec(&operation, m))?;
        let up_to_date = K::is_up_to_date(&observed, record.params());
        let details = K::connection_details(&observed);
        debug!(up_to_date, "Observed remote resource");

        record.status.at_provider = Some(observed);
        Ok(ExternalObservation::present(up_to_date).with_connection_details(details))
    }

    #[instrument(skip_all, fields(name = %record.metadata.name))]
    async fn create(
        &self,
        ctx: &PassContext,
        record: &mut KindRecord<K>,
    ) -> ReconcileResult<ExternalCreation> {
        let operation = Self::operation("create");

        let request = K::create_request(record.params());
        let response = self
            .transport
            .execute(request, &ctx.cancel)
            .await
            .during(&operation)?;

        let external_name = K::created_external_name(record.params(), &response)
            .map_err(|m| ReconcileError::codec(&operation, m))?;
        Ok(ExternalCreation::named(external_name))
    }

    #[instrument(skip_all, fields(name = %record.metadata.name))]
    async fn update(
        &self,
        ctx: &PassContext,
        record: &mut KindRecord<K>,
    ) -> ReconcileResult<ExternalUpdate> {
        let operation = Self::operation("update");
        let external_name = require_external_name(record, "update")?;

        let requests = K::update_requests(
            record.params(),
            external_name,
            record.status.at_provider.as_ref(),
        );
        if requests.is_empty() {
            debug!("Nothing mutable to update");
        }
        for request in requests {
            self.transport
                .execute(request, &ctx.cancel)
                .await
                .during(&operation)?;
        }
        Ok(ExternalUpdate::default())
    }

    #[instrument(skip_all, fields(name = %record.metadata.name))]
    async fn delete(&self, ctx: &PassContext, record: &KindRecord<K>) -> ReconcileResult<()> {
        let operation = Self::operation("delete");
        let external_name = require_external_name(record, "delete")?;

        let request = K::delete_request(record.params(), external_name);
        match self.transport.execute(request, &ctx.cancel).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("Remote resource already gone");
                Ok(())
            }
            Err(e) => Err(ReconcileError::transport(operation, e)),
        }
    }
}
