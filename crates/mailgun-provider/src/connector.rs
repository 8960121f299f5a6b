//! Binds records to transports and per-kind clients.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailgun_reconcile_common::{
    Connector, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate, Managed,
    PassContext, ReconcileError, ReconcileResult,
};
use mailgun_transport::{
    ClientConfig, HttpTransport, Region, RetryPolicy, Transport, TransportResult,
};
use tracing::{debug, instrument};

use crate::client::ResourceClient;
use crate::config::ProviderConfig;
use crate::credentials::{CredentialResolver, ResolvedCredentials};
use crate::record::Resource;
use crate::resources::bounce::Bounce;
use crate::resources::complaint::Complaint;
use crate::resources::domain::Domain;
use crate::resources::mailing_list::MailingList;
use crate::resources::route::Route;
use crate::resources::template::Template;
use crate::resources::unsubscribe::Unsubscribe;
use crate::resources::webhook::Webhook;
use crate::secrets::SecretStore;
use crate::smtp::SmtpCredentialClient;

/// Builds a transport for resolved account credentials.
pub trait TransportFactory: Send + Sync {
    fn build(&self, credentials: &ResolvedCredentials) -> ReconcileResult<Arc<dyn Transport>>;
}

/// HTTP transports sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    http: reqwest::Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpTransportFactory {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> TransportResult<Self> {
        Ok(Self {
            http: HttpTransport::build_http_client()?,
            timeout,
            retry,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> TransportResult<Self> {
        Self::new(config.request_timeout(), config.retry_policy())
    }
}

impl TransportFactory for HttpTransportFactory {
    fn build(&self, credentials: &ResolvedCredentials) -> ReconcileResult<Arc<dyn Transport>> {
        let mut config = ClientConfig::new(credentials.api_key.clone(), credentials.region)
            .with_timeout(self.timeout)
            .with_retry(self.retry.clone());
        if let Some(base_url) = &credentials.base_url {
            config = config.with_base_url(base_url.clone());
        }

        let transport = HttpTransport::with_http_client(config, self.http.clone())
            .map_err(|e| ReconcileError::connection(format!("cannot build transport: {e}")))?;
        Ok(Arc::new(transport))
    }
}

/// Connects records of every kind.
///
/// Connecting resolves the record's credential reference and builds a
/// transport. It issues no remote calls.
#[derive(Clone)]
pub struct ProviderConnector {
    resolver: Arc<dyn CredentialResolver>,
    factory: Arc<dyn TransportFactory>,
    secrets: Arc<dyn SecretStore>,
}

impl ProviderConnector {
    pub fn new(
        resolver: Arc<dyn CredentialResolver>,
        factory: Arc<dyn TransportFactory>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            resolver,
            factory,
            secrets,
        }
    }
}

#[async_trait]
impl Connector<Resource> for ProviderConnector {
    #[instrument(skip_all, fields(kind = %record.kind(), name = %record.name()))]
    async fn connect(
        &self,
        _ctx: &PassContext,
        record: &Resource,
    ) -> ReconcileResult<Box<dyn ExternalClient<Resource>>> {
        let credentials = self.resolver.resolve(record.credential_ref()).await?;
        let transport = self.factory.build(&credentials)?;
        debug!(region = %credentials.region, "Connected");

        Ok(Box::new(ProviderClient {
            transport,
            secrets: self.secrets.clone(),
            region: credentials.region,
        }))
    }
}

/// Routes each operation to the client for the record's kind.
struct ProviderClient {
    transport: Arc<dyn Transport>,
    secrets: Arc<dyn SecretStore>,
    region: Region,
}

impl ProviderClient {
    fn kind<K>(&self) -> ResourceClient<K>
    where
        K: crate::resources::RemoteResource,
    {
        ResourceClient::new(self.transport.clone())
    }

    fn smtp(&self) -> SmtpCredentialClient {
        SmtpCredentialClient::new(self.transport.clone(), self.secrets.clone(), self.region)
    }
}

macro_rules! dispatch {
    ($client:ident, $record:expr, $op:ident, $ctx:expr) => {
        match $record {
            Resource::Domain(r) => $client.kind::<Domain>().$op($ctx, r).await,
            Resource::MailingList(r) => $client.kind::<MailingList>().$op($ctx, r).await,
            Resource::Route(r) => $client.kind::<Route>().$op($ctx, r).await,
            Resource::Webhook(r) => $client.kind::<Webhook>().$op($ctx, r).await,
            Resource::Template(r) => $client.kind::<Template>().$op($ctx, r).await,
            Resource::SmtpCredential(r) => $client.smtp().$op($ctx, r).await,
            Resource::Bounce(r) => $client.kind::<Bounce>().$op($ctx, r).await,
            Resource::Complaint(r) => $client.kind::<Complaint>().$op($ctx, r).await,
            Resource::Unsubscribe(r) => $client.kind::<Unsubscribe>().$op($ctx, r).await,
        }
    };
}

#[async_trait]
impl ExternalClient<Resource> for ProviderClient {
    async fn observe(
        &self,
        ctx: &PassContext,
        record: &mut Resource,
    ) -> ReconcileResult<ExternalObservation> {
        dispatch!(self, record, observe, ctx)
    }

    async fn create(
        &self,
        ctx: &PassContext,
        record: &mut Resource,
    ) -> ReconcileResult<ExternalCreation> {
        dispatch!(self, record, create, ctx)
    }

    async fn update(&self, ctx: &PassContext, record: &mut Resource) -> ReconcileResult<ExternalUpdate> {
        dispatch!(self, record, update, ctx)
    }

    async fn delete(&self, ctx: &PassContext, record: &Resource) -> ReconcileResult<()> {
        dispatch!(self, record, delete, ctx)
    }
}
