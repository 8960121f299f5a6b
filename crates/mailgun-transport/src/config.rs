//! Client configuration: region, endpoint and credentials.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// US API endpoint.
pub const US_BASE_URL: &str = "https://api.mailgun.net";

/// EU API endpoint.
pub const EU_BASE_URL: &str = "https://api.eu.mailgun.net";

/// US SMTP relay.
pub const US_SMTP_ENDPOINT: &str = "smtp.mailgun.org";

/// EU SMTP relay.
pub const EU_SMTP_ENDPOINT: &str = "smtp.eu.mailgun.org";

/// SMTP submission port published with credentials.
pub const SMTP_PORT: u16 = 587;

/// Default per-attempt request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Basic-auth user name Mailgun expects alongside the API key.
pub const API_USER: &str = "api";

/// Mailgun region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    /// API base URL for the region.
    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Us => US_BASE_URL,
            Region::Eu => EU_BASE_URL,
        }
    }

    /// SMTP relay host for the region.
    pub fn smtp_endpoint(&self) -> &'static str {
        match self {
            Region::Us => US_SMTP_ENDPOINT,
            Region::Eu => EU_SMTP_ENDPOINT,
        }
    }

    /// Returns the region name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Eu => "eu",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "us" => Ok(Region::Us),
            "eu" => Ok(Region::Eu),
            other => Err(format!("unknown region '{other}' (expected 'us' or 'eu')")),
        }
    }
}

/// Everything needed to build a transport for one account.
#[derive(Clone)]
pub struct ClientConfig {
    /// Account API key.
    pub api_key: String,
    /// Region used when no explicit base URL is set.
    pub region: Region,
    /// Explicit base URL, overriding the region's.
    pub base_url: Option<String>,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retry policy.
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Creates a config for the given key and region with default timeout and retry.
    pub fn new(api_key: impl Into<String>, region: Region) -> Self {
        Self {
            api_key: api_key.into(),
            region,
            base_url: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Effective base URL without a trailing slash.
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.region.base_url())
            .trim_end_matches('/')
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("region", &self.region)
            .field("base_url", &self.effective_base_url())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}
