//! Provider configuration loaded from YAML.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mailgun_reconcile_common::DEFAULT_MAX_CONCURRENT_RECONCILES;
use mailgun_transport::{
    Region, RetryPolicy, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF,
    DEFAULT_MAX_RATE_LIMIT_WAIT, DEFAULT_RATE_LIMIT_FALLBACK, DEFAULT_REQUEST_TIMEOUT,
};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

/// Default interval between controller rounds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default root of the file secret store.
pub const DEFAULT_SECRET_STORE_DIR: &str = "secrets";

/// Environment variable holding the API key of the `default` account.
pub const DEFAULT_API_KEY_ENV: &str = "MAILGUN_API_KEY";

/// Retry settings as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub rate_limit_fallback_secs: u64,
    pub max_rate_limit_wait_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF.as_millis() as u64,
            max_backoff_ms: DEFAULT_MAX_BACKOFF.as_millis() as u64,
            rate_limit_fallback_secs: DEFAULT_RATE_LIMIT_FALLBACK.as_secs(),
            max_rate_limit_wait_secs: DEFAULT_MAX_RATE_LIMIT_WAIT.as_secs(),
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
            .with_initial_backoff(Duration::from_millis(self.initial_backoff_ms))
            .with_max_backoff(Duration::from_millis(self.max_backoff_ms))
            .with_rate_limit_fallback(Duration::from_secs(self.rate_limit_fallback_secs))
            .with_max_rate_limit_wait(Duration::from_secs(self.max_rate_limit_wait_secs))
    }
}

/// One Mailgun account a `credentialRef` can name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AccountConfig {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Region, defaulting to the provider's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    /// Base URL override, defaulting to the provider's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl AccountConfig {
    pub fn from_env(api_key_env: impl Into<String>) -> Self {
        Self {
            api_key_env: api_key_env.into(),
            region: None,
            base_url: None,
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Region for accounts that name none.
    pub region: Region,
    /// Base URL override for accounts that name none.
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub retry: RetrySettings,
    pub max_concurrent_reconciles: usize,
    pub poll_interval_secs: u64,
    pub secret_store_dir: PathBuf,
    /// Accounts by credential reference name.
    pub credentials: BTreeMap<String, AccountConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: Region::default(),
            base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            retry: RetrySettings::default(),
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            secret_store_dir: PathBuf::from(DEFAULT_SECRET_STORE_DIR),
            credentials: BTreeMap::from([(
                "default".to_string(),
                AccountConfig::from_env(DEFAULT_API_KEY_ENV),
            )]),
        }
    }
}

impl ProviderConfig {
    /// Loads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ProviderError::io(path, e))?;
        Self::from_yaml(&text).map_err(|e| match e {
            ProviderError::Yaml { source, .. } => ProviderError::yaml(path, source),
            other => other,
        })
    }

    /// Parses and validates YAML text.
    pub fn from_yaml(text: &str) -> ProviderResult<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| ProviderError::yaml("<inline>", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ProviderResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(ProviderError::invalid_config(
                "retry.max_attempts",
                "must be at least 1",
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ProviderError::invalid_config(
                "retry.initial_backoff_ms",
                "must not exceed retry.max_backoff_ms",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ProviderError::invalid_config(
                "request_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.max_concurrent_reconciles == 0 {
            return Err(ProviderError::invalid_config(
                "max_concurrent_reconciles",
                "must be at least 1",
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ProviderError::invalid_config(
                "poll_interval_secs",
                "must be greater than 0",
            ));
        }
        for (name, account) in &self.credentials {
            if account.api_key_env.trim().is_empty() {
                return Err(ProviderError::invalid_config(
                    format!("credentials.{name}.api_key_env"),
                    "must name an environment variable",
                ));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.to_policy()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
