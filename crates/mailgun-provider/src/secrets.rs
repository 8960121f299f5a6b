//! Secret storage and connection-detail publishing.
//!
//! The secret store is the only place a write-once SMTP password survives
//! after its create response, so publishing always merges into an existing
//! secret rather than replacing it.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use mailgun_reconcile_common::{
    ConnectionDetails, ConnectionPublisher, ReconcileError, ReconcileResult, SecretKeySelector,
    SecretReference,
};
use tracing::debug;

use crate::error::ProviderError;

/// Contents of one secret.
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Key-value secret storage addressed by name and namespace.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Reads a secret. A missing secret is `Ok(None)`.
    async fn get(&self, secret: &SecretReference) -> ReconcileResult<Option<SecretData>>;

    /// Writes a secret, replacing any previous contents.
    async fn put(&self, secret: &SecretReference, data: SecretData) -> ReconcileResult<()>;

    /// Deletes a secret. A missing secret is success.
    async fn delete(&self, secret: &SecretReference) -> ReconcileResult<()>;

    /// Reads one key of a secret.
    async fn get_key(&self, selector: &SecretKeySelector) -> ReconcileResult<Option<Vec<u8>>> {
        Ok(self
            .get(&selector.secret)
            .await?
            .and_then(|mut data| data.remove(&selector.key)))
    }
}

/// Secrets stored as JSON files at `<root>/<namespace>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, secret: &SecretReference) -> ReconcileResult<PathBuf> {
        for part in [&secret.namespace, &secret.name] {
            if part.is_empty()
                || part.contains(|c: char| c == '/' || c == '\\')
                || part.starts_with('.')
            {
                return Err(ReconcileError::secret_store(format!(
                    "invalid secret reference '{}'",
                    secret
                )));
            }
        }
        Ok(self
            .root
            .join(&secret.namespace)
            .join(format!("{}.json", secret.name)))
    }
}

fn store_error(err: ProviderError) -> ReconcileError {
    ReconcileError::secret_store(err.to_string())
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, secret: &SecretReference) -> ReconcileResult<Option<SecretData>> {
        let path = self.path_for(secret)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_error(ProviderError::io(&path, e))),
        };

        let values: BTreeMap<String, String> = serde_json::from_slice(&bytes)
            .map_err(|e| store_error(ProviderError::json(&path, e)))?;
        Ok(Some(
            values
                .into_iter()
                .map(|(k, v)| (k, v.into_bytes()))
                .collect(),
        ))
    }

    async fn put(&self, secret: &SecretReference, data: SecretData) -> ReconcileResult<()> {
        let path = self.path_for(secret)?;
        let values = data
            .into_iter()
            .map(|(k, v)| match String::from_utf8(v) {
                Ok(v) => Ok((k, v)),
                Err(_) => Err(ReconcileError::secret_store(format!(
                    "key '{}' of secret '{}' is not valid UTF-8",
                    k, secret
                ))),
            })
            .collect::<ReconcileResult<BTreeMap<String, String>>>()?;

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| store_error(ProviderError::io(dir, e)))?;
        }

        let body = serde_json::to_vec_pretty(&values)
            .map_err(|e| store_error(ProviderError::json(&path, e)))?;

        // Write then rename so a crash never leaves a half-written secret.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| store_error(ProviderError::io(&tmp, e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| store_error(ProviderError::io(&path, e)))?;

        debug!(secret = %secret, "Wrote secret");
        Ok(())
    }

    async fn delete(&self, secret: &SecretReference) -> ReconcileResult<()> {
        let path = self.path_for(secret)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(secret = %secret, "Deleted secret");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_error(ProviderError::io(&path, e))),
        }
    }
}

/// Publishes connection details into a [`SecretStore`].
#[derive(Clone)]
pub struct SecretStorePublisher {
    store: Arc<dyn SecretStore>,
}

impl SecretStorePublisher {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ConnectionPublisher for SecretStorePublisher {
    async fn publish(
        &self,
        secret: &SecretReference,
        details: &ConnectionDetails,
    ) -> ReconcileResult<()> {
        let mut data = self.store.get(secret).await?.unwrap_or_default();
        let before = data.clone();
        data.extend(details.iter().map(|(k, v)| (k.clone(), v.clone())));
        if data == before {
            return Ok(());
        }
        self.store.put(secret, data).await
    }

    async fn unpublish(&self, secret: &SecretReference) -> ReconcileResult<()> {
        self.store.delete(secret).await
    }
}
