//! Write-once SMTP credentials and their rotation.
//!
//! The remote API returns a credential's password once, in the create
//! response. From then on the published connection secret is the only
//! evidence that a usable credential exists:
//!
//! - no connection secret configured: absent
//! - secret missing, or its `password` empty: absent, which triggers a
//!   rotation on create
//! - otherwise: present and up to date, unconditionally
//!
//! Every create rotates: it deletes the login first, tolerating `NotFound`,
//! then creates it again. Any other failure of that delete aborts the create
//! so a credential is never orphaned or duplicated.

use std::sync::Arc;

use async_trait::async_trait;
use mailgun_reconcile_common::{
    ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate, Managed, PassContext,
    ReconcileError, ReconcileResult, SecretKeySelector, TransportResultExt,
};
use mailgun_transport::{Region, Transport};
use tracing::{debug, info, instrument, warn};

use crate::resources::smtp_credential::{
    create_request, created_password, credential_details, delete_request, keys, update_request,
    username, SmtpCredentialObservation, SmtpCredentialParameters, SmtpCredentialRecord,
};
use crate::secrets::SecretStore;

const CREATE: &str = "create smtp credential";
const UPDATE: &str = "update smtp credential";
const DELETE: &str = "delete smtp credential";

/// External client for SMTP credentials.
pub struct SmtpCredentialClient {
    transport: Arc<dyn Transport>,
    secrets: Arc<dyn SecretStore>,
    region: Region,
}

impl SmtpCredentialClient {
    pub fn new(transport: Arc<dyn Transport>, secrets: Arc<dyn SecretStore>, region: Region) -> Self {
        Self {
            transport,
            secrets,
            region,
        }
    }

    /// Remote login the record refers to.
    fn login(record: &SmtpCredentialRecord) -> String {
        record
            .external_name()
            .unwrap_or(&record.spec.for_provider.login)
            .to_string()
    }

    /// Password declared through `passwordSecretRef`, if any.
    async fn declared_password(&self, params: &SmtpCredentialParameters) -> ReconcileResult<Option<String>> {
        match &params.password_secret_ref {
            Some(selector) => self.read_password(selector).await.map(Some),
            None => Ok(None),
        }
    }

    async fn read_password(&self, selector: &SecretKeySelector) -> ReconcileResult<String> {
        let bytes = self.secrets.get_key(selector).await?.unwrap_or_default();
        let password = String::from_utf8(bytes).map_err(|_| {
            ReconcileError::secret_store(format!(
                "key '{}' of secret '{}' is not valid UTF-8",
                selector.key, selector.secret
            ))
        })?;
        if password.is_empty() {
            return Err(ReconcileError::secret_store(format!(
                "key '{}' of secret '{}' is missing or empty",
                selector.key, selector.secret
            )));
        }
        Ok(password)
    }

    /// Deletes `login` ahead of a create. `NotFound` means there was
    /// nothing to rotate away.
    async fn rotate_away(
        &self,
        ctx: &PassContext,
        params: &SmtpCredentialParameters,
        login: &str,
    ) -> ReconcileResult<()> {
        match self
            .transport
            .execute(delete_request(params, login), &ctx.cancel)
            .await
        {
            Ok(_) => {
                info!(login, "Deleted previous credential before re-creating it");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(login, "No previous credential to rotate away");
                Ok(())
            }
            Err(e) => {
                warn!(login, error = %e, "Rotation aborted, credential left untouched");
                Err(ReconcileError::rotation(login, e))
            }
        }
    }
}

#[async_trait]
impl ExternalClient<SmtpCredentialRecord> for SmtpCredentialClient {
    #[instrument(skip_all, fields(name = %record.metadata.name))]
    async fn observe(
        &self,
        _ctx: &PassContext,
        record: &mut SmtpCredentialRecord,
    ) -> ReconcileResult<ExternalObservation> {
        let Some(secret) = record.connection_secret_ref() else {
            debug!("No connection secret configured, credential is absent");
            return Ok(ExternalObservation::absent());
        };

        let populated = self
            .secrets
            .get(secret)
            .await?
            .and_then(|mut data| data.remove(keys::PASSWORD))
            .map_or(false, |password| !password.is_empty());
        if !populated {
            info!(secret = %secret, "Connection secret missing or empty, credential will be rotated");
            return Ok(ExternalObservation::absent());
        }

        record.status.at_provider = Some(SmtpCredentialObservation {
            login: Self::login(record),
        });
        Ok(ExternalObservation::present(true))
    }

    #[instrument(skip_all, fields(name = %record.metadata.name))]
    async fn create(
        &self,
        ctx: &PassContext,
        record: &mut SmtpCredentialRecord,
    ) -> ReconcileResult<ExternalCreation> {
        let params = record.spec.for_provider.clone();
        let login = Self::login(record);

        self.rotate_away(ctx, &params, &login).await?;

        let declared = self.declared_password(&params).await?;
        let response = self
            .transport
            .execute(create_request(&params, declared.as_deref()), &ctx.cancel)
            .await
            .during(CREATE)?;
        let password = created_password(declared.as_deref(), &response)
            .map_err(|m| ReconcileError::codec(CREATE, m))?;

        info!(login = %params.login, "Created credential");
        record.status.at_provider = Some(SmtpCredentialObservation {
            login: params.login.clone(),
        });
        Ok(ExternalCreation::named(params.login.clone()).with_connection_details(
            credential_details(&username(&params), &password, self.region),
        ))
    }

    #[instrument(skip_all, fields(name = %record.metadata.name))]
    async fn update(
        &self,
        ctx: &PassContext,
        record: &mut SmtpCredentialRecord,
    ) -> ReconcileResult<ExternalUpdate> {
        let params = record.spec.for_provider.clone();
        let Some(selector) = &params.password_secret_ref else {
            debug!("No password declared, nothing to update");
            return Ok(ExternalUpdate::default());
        };

        let password = self.read_password(selector).await?;
        let login = Self::login(record);
        self.transport
            .execute(update_request(&params, &login, &password), &ctx.cancel)
            .await
            .during(UPDATE)?;

        info!(login = %login, "Updated credential password");
        Ok(ExternalUpdate {
            connection_details: credential_details(&username(&params), &password, self.region),
        })
    }

    #[instrument(skip_all, fields(name = %record.metadata.name))]
    async fn delete(&self, ctx: &PassContext, record: &SmtpCredentialRecord) -> ReconcileResult<()> {
        let params = &record.spec.for_provider;
        let login = Self::login(record);
        match self
            .transport
            .execute(delete_request(params, &login), &ctx.cancel)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ReconcileError::transport(DELETE, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{FileSecretStore, SecretData};
    use mailgun_reconcile_common::{connection_details, ManagedRecord, SecretReference};
    use mailgun_transport::{ApiRequest, CancellationToken, TransportError, TransportResult};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Replay {
        responses: Mutex<VecDeque<TransportResult<Value>>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl Transport for Replay {
        async fn execute(&self, request: ApiRequest, _: &CancellationToken) -> TransportResult<Value> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    fn replay(responses: Vec<TransportResult<Value>>) -> Arc<Replay> {
        Arc::new(Replay {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn record() -> SmtpCredentialRecord {
        ManagedRecord::new(
            "alerts",
            SmtpCredentialParameters {
                domain: "mg.example.com".to_string(),
                login: "alerts".to_string(),
                password_secret_ref: None,
            },
        )
        .with_connection_secret(SecretReference::new("alerts-smtp", "mail"))
    }

    fn client(transport: Arc<Replay>, dir: &tempfile::TempDir) -> (SmtpCredentialClient, Arc<FileSecretStore>) {
        let store = Arc::new(FileSecretStore::new(dir.path()));
        (
            SmtpCredentialClient::new(transport, store.clone(), Region::Us),
            store,
        )
    }

    async fn seed(store: &FileSecretStore, data: SecretData) {
        store
            .put(&SecretReference::new("alerts-smtp", "mail"), data)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_observe_without_secret_ref_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let transport = replay(vec![]);
        let (client, _) = client(transport.clone(), &dir);
        let mut record = record();
        record.spec.write_connection_secret_to = None;

        let observation = client.observe(&PassContext::new(), &mut record).await.unwrap();
        assert!(!observation.resource_exists);
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_observe_empty_password_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let (client, store) = client(replay(vec![]), &dir);
        seed(&store, connection_details([("username", "alerts@mg.example.com"), ("password", "")])).await;

        let mut record = record().with_external_name("alerts");
        let observation = client.observe(&PassContext::new(), &mut record).await.unwrap();
        assert!(!observation.resource_exists);
    }

    #[tokio::test]
    async fn test_observe_populated_secret_is_current_without_remote_call() {
        let dir = tempfile::tempdir().unwrap();
        let transport = replay(vec![]);
        let (client, store) = client(transport.clone(), &dir);
        seed(&store, connection_details([("password", "pw")])).await;

        let mut record = record().with_external_name("alerts");
        let observation = client.observe(&PassContext::new(), &mut record).await.unwrap();

        assert!(observation.resource_exists);
        assert!(observation.resource_up_to_date);
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rotates_then_publishes_generated_password() {
        let dir = tempfile::tempdir().unwrap();
        let transport = replay(vec![
            Err(TransportError::not_found("Credential not found")),
            Ok(json!({"message": "Created 1 credentials pair(s)", "password": "gen-pw"})),
        ]);
        let (client, _) = client(transport.clone(), &dir);
        let mut record = record();

        let creation = client.create(&PassContext::new(), &mut record).await.unwrap();

        let requests: Vec<String> = transport
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            requests,
            vec![
                "DELETE /v3/domains/mg.example.com/credentials/alerts",
                "POST /v3/domains/mg.example.com/credentials",
            ]
        );
        assert_eq!(creation.external_name.as_deref(), Some("alerts"));
        assert_eq!(creation.connection_details[keys::PASSWORD], b"gen-pw".to_vec());
        assert_eq!(
            creation.connection_details[keys::USERNAME],
            b"alerts@mg.example.com".to_vec()
        );
    }

    #[tokio::test]
    async fn test_failed_rotation_aborts_create() {
        let dir = tempfile::tempdir().unwrap();
        let transport = replay(vec![Err(TransportError::authentication("bad key"))]);
        let (client, _) = client(transport.clone(), &dir);

        let err = client
            .create(&PassContext::new(), &mut record())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Rotation { ref login, .. } if login == "alerts"));
        assert_eq!(transport.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_declared_password() {
        let dir = tempfile::tempdir().unwrap();
        let transport = replay(vec![Ok(Value::Null), Ok(json!({"message": "Created"}))]);
        let (client, store) = client(transport.clone(), &dir);
        store
            .put(
                &SecretReference::new("alerts-password", "mail"),
                connection_details([("value", "chosen")]),
            )
            .await
            .unwrap();

        let mut record = record();
        record.spec.for_provider.password_secret_ref =
            Some(SecretKeySelector::new("alerts-password", "mail", "value"));

        let creation = client.create(&PassContext::new(), &mut record).await.unwrap();
        assert_eq!(creation.connection_details[keys::PASSWORD], b"chosen".to_vec());

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[1].form.get("password"), Some("chosen"));
    }

    #[tokio::test]
    async fn test_update_without_declared_password_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let transport = replay(vec![]);
        let (client, _) = client(transport.clone(), &dir);

        let update = client
            .update(&PassContext::new(), &mut record().with_external_name("alerts"))
            .await
            .unwrap();
        assert!(update.connection_details.is_empty());
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_password_secret_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (client, _) = client(replay(vec![]), &dir);
        let mut record = record().with_external_name("alerts");
        record.spec.for_provider.password_secret_ref =
            Some(SecretKeySelector::new("absent", "mail", "value"));

        let err = client
            .update(&PassContext::new(), &mut record)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::SecretStore { .. }));
    }
}
