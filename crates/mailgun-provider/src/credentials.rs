//! Resolution of a record's `credentialRef` into account credentials.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use mailgun_reconcile_common::{CredentialRef, ReconcileError, ReconcileResult};
use mailgun_transport::Region;
use tracing::debug;

use crate::config::{AccountConfig, ProviderConfig};

/// Credentials for one Mailgun account.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub api_key: String,
    pub region: Region,
    /// Base URL override, `None` for the region's.
    pub base_url: Option<String>,
}

impl ResolvedCredentials {
    pub fn new(api_key: impl Into<String>, region: Region) -> Self {
        Self {
            api_key: api_key.into(),
            region,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("api_key", &"<redacted>")
            .field("region", &self.region)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Looks up the account a credential reference names.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Fails with [`ReconcileError::Connection`] when the reference cannot
    /// be resolved.
    async fn resolve(&self, credential_ref: &CredentialRef) -> ReconcileResult<ResolvedCredentials>;
}

/// Resolves accounts from the provider config, reading API keys from the
/// environment.
#[derive(Debug, Clone)]
pub struct EnvCredentialResolver {
    accounts: BTreeMap<String, AccountConfig>,
    default_region: Region,
    default_base_url: Option<String>,
}

impl EnvCredentialResolver {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            accounts: config.credentials.clone(),
            default_region: config.region,
            default_base_url: config.base_url.clone(),
        }
    }

    fn resolve_with(
        &self,
        credential_ref: &CredentialRef,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ReconcileResult<ResolvedCredentials> {
        let account = self.accounts.get(&credential_ref.name).ok_or_else(|| {
            ReconcileError::connection(format!(
                "unknown credential reference '{}'",
                credential_ref.name
            ))
        })?;

        let api_key = lookup(&account.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ReconcileError::connection(format!(
                    "environment variable '{}' for credential reference '{}' is not set",
                    account.api_key_env, credential_ref.name
                ))
            })?;

        let region = account.region.unwrap_or(self.default_region);
        debug!(credential_ref = %credential_ref.name, %region, "Resolved credentials");
        Ok(ResolvedCredentials {
            api_key,
            region,
            base_url: account
                .base_url
                .clone()
                .or_else(|| self.default_base_url.clone()),
        })
    }
}

#[async_trait]
impl CredentialResolver for EnvCredentialResolver {
    async fn resolve(&self, credential_ref: &CredentialRef) -> ReconcileResult<ResolvedCredentials> {
        self.resolve_with(credential_ref, |var| std::env::var(var).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver() -> EnvCredentialResolver {
        let mut config = ProviderConfig {
            region: Region::Eu,
            ..ProviderConfig::default()
        };
        config.credentials.insert(
            "marketing".to_string(),
            AccountConfig {
                api_key_env: "MARKETING_KEY".to_string(),
                region: Some(Region::Us),
                base_url: Some("http://127.0.0.1:9000".to_string()),
            },
        );
        EnvCredentialResolver::from_config(&config)
    }

    fn env(var: &str) -> Option<String> {
        match var {
            "MAILGUN_API_KEY" => Some("key-default".to_string()),
            "MARKETING_KEY" => Some("key-marketing".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_resolve_default_account() {
        let creds = resolver()
            .resolve_with(&CredentialRef::default(), env)
            .unwrap();
        assert_eq!(creds, ResolvedCredentials::new("key-default", Region::Eu));
    }

    #[test]
    fn test_account_overrides() {
        let creds = resolver()
            .resolve_with(&CredentialRef::new("marketing"), env)
            .unwrap();
        assert_eq!(creds.region, Region::Us);
        assert_eq!(creds.base_url.as_deref(), Some("http://127.0.0.1:9000"));
    }

    #[test]
    fn test_unresolvable_references() {
        let err = resolver()
            .resolve_with(&CredentialRef::new("ops"), env)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Connection { .. }));

        let err = resolver()
            .resolve_with(&CredentialRef::default(), |_| None)
            .unwrap_err();
        assert!(err.to_string().contains("MAILGUN_API_KEY"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let creds = ResolvedCredentials::new("key-secret", Region::Us);
        assert!(!format!("{creds:?}").contains("key-secret"));
    }
}
