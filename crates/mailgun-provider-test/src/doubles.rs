//! In-memory collaborators: secret store and credential resolver.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mailgun_provider::{CredentialResolver, ResolvedCredentials, SecretData, SecretStore};
use mailgun_reconcile_common::{CredentialRef, ReconcileError, ReconcileResult, SecretReference};
use mailgun_transport::Region;

/// Secret store held in memory.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<BTreeMap<SecretReference, SecretData>>,
    unavailable: AtomicBool,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SecretReference, SecretData>> {
        self.secrets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> ReconcileResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ReconcileError::secret_store("secret store unavailable"));
        }
        Ok(())
    }

    /// Makes every operation fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Stores a secret from string pairs.
    pub fn insert<'a>(
        &self,
        secret: &SecretReference,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        let data = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect();
        self.lock().insert(secret.clone(), data);
    }

    pub fn snapshot(&self, secret: &SecretReference) -> Option<SecretData> {
        self.lock().get(secret).cloned()
    }

    /// One key of a secret as a string.
    pub fn value(&self, secret: &SecretReference, key: &str) -> Option<String> {
        self.snapshot(secret)
            .and_then(|mut data| data.remove(key))
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, secret: &SecretReference) -> ReconcileResult<Option<SecretData>> {
        self.check_available()?;
        Ok(self.snapshot(secret))
    }

    async fn put(&self, secret: &SecretReference, data: SecretData) -> ReconcileResult<()> {
        self.check_available()?;
        self.lock().insert(secret.clone(), data);
        Ok(())
    }

    async fn delete(&self, secret: &SecretReference) -> ReconcileResult<()> {
        self.check_available()?;
        self.lock().remove(secret);
        Ok(())
    }
}

/// Resolves credential references from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialResolver {
    accounts: BTreeMap<String, ResolvedCredentials>,
}

impl StaticCredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with only the `default` account.
    pub fn single(api_key: impl Into<String>, region: Region) -> Self {
        Self::new().with_account("default", ResolvedCredentials::new(api_key, region))
    }

    pub fn with_account(mut self, name: impl Into<String>, credentials: ResolvedCredentials) -> Self {
        self.accounts.insert(name.into(), credentials);
        self
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentialResolver {
    async fn resolve(&self, credential_ref: &CredentialRef) -> ReconcileResult<ResolvedCredentials> {
        self.accounts.get(&credential_ref.name).cloned().ok_or_else(|| {
            ReconcileError::connection(format!(
                "unknown credential reference '{}'",
                credential_ref.name
            ))
        })
    }
}
