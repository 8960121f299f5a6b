//! Mailgun provider: reconciles declared Mailgun resources.
//!
//! Domains, mailing lists, routes, webhooks, templates, SMTP credentials and
//! suppressions (bounces, complaints, unsubscribes) are declared as records
//! and driven through the reconcile core in `mailgun-reconcile-common`:
//!
//! - [`resources`]: per-kind codecs and drift comparators
//! - [`ResourceClient`]: the generic client for every readable kind
//! - [`SmtpCredentialClient`]: write-once credentials and their rotation
//! - [`ProviderConnector`]: resolves credentials and dispatches by kind
//! - [`SecretStore`] / [`SecretStorePublisher`]: where connection details live
//! - [`ProviderConfig`]: the YAML configuration of the binary

pub mod client;
pub mod config;
pub mod connector;
pub mod credentials;
pub mod error;
pub mod metrics;
pub mod paths;
pub mod record;
pub mod resources;
pub mod secrets;
pub mod smtp;

pub use client::ResourceClient;
pub use config::{AccountConfig, ProviderConfig, RetrySettings};
pub use connector::{HttpTransportFactory, ProviderConnector, TransportFactory};
pub use credentials::{CredentialResolver, EnvCredentialResolver, ResolvedCredentials};
pub use error::{ProviderError, ProviderResult};
pub use metrics::{MetricsSnapshot, TracingMetrics};
pub use record::{load_records, save_records, Resource};
pub use resources::{KindRecord, RemoteResource};
pub use secrets::{FileSecretStore, SecretData, SecretStore, SecretStorePublisher};
pub use smtp::SmtpCredentialClient;
