//! Desired-state records and their status.
//!
//! A [`ManagedRecord`] declares one external resource: kind-specific
//! parameters, the credentials to reach the remote API with, and where to
//! publish connection details. The reconcile core reads the record and
//! writes back its status and remote identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kind::ResourceKind;

/// Reference to the account configuration a transport is built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialRef {
    /// Name of the account configuration.
    pub name: String,
}

impl CredentialRef {
    /// Creates a credential reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for CredentialRef {
    fn default() -> Self {
        Self::new("default")
    }
}

/// Address of a secret record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecretReference {
    /// Secret name.
    pub name: String,
    /// Secret namespace.
    pub namespace: String,
}

impl SecretReference {
    /// Creates a secret reference.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl std::fmt::Display for SecretReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One key inside a secret record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretKeySelector {
    /// Secret holding the value.
    #[serde(flatten)]
    pub secret: SecretReference,
    /// Key within the secret.
    pub key: String,
}

impl SecretKeySelector {
    /// Creates a key selector.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            secret: SecretReference::new(name, namespace),
            key: key.into(),
        }
    }
}

/// Kind-specific parameters declare which kind they belong to.
pub trait ForProvider {
    /// Kind of the resource these parameters describe.
    const KIND: ResourceKind;
}

/// Record metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    /// Record name, unique per kind.
    pub name: String,
    /// Remote identifier, assigned on first successful create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_name: Option<String>,
    /// The declarer asked for the remote resource to be deleted.
    #[serde(default)]
    pub deletion_requested: bool,
}

/// Record spec: parameters plus wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSpec<P> {
    /// Kind-specific desired parameters.
    pub for_provider: P,
    /// Account configuration used to connect.
    #[serde(default)]
    pub credential_ref: CredentialRef,
    /// Where connection details are published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to: Option<SecretReference>,
}

/// Condition types reported on every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// Whether the remote resource is usable.
    Ready,
    /// Whether the last pass succeeded.
    Synced,
}

/// Machine-readable reason for a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionReason {
    Available,
    Creating,
    Deleting,
    Unavailable,
    ReconcileSuccess,
    ReconcileError,
}

/// Observable condition of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type.
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    /// True if the condition holds.
    pub status: bool,
    /// Reason code.
    pub reason: ConditionReason,
    /// Human-readable detail, set for errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When status or reason last changed.
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    fn new(condition_type: ConditionType, status: bool, reason: ConditionReason) -> Self {
        Self {
            condition_type,
            status,
            reason,
            message: None,
            last_transition_time: Utc::now(),
        }
    }

    /// Ready: the remote resource exists and matches the declaration.
    pub fn available() -> Self {
        Self::new(ConditionType::Ready, true, ConditionReason::Available)
    }

    /// Not ready: creation was requested.
    pub fn creating() -> Self {
        Self::new(ConditionType::Ready, false, ConditionReason::Creating)
    }

    /// Not ready: deletion was requested.
    pub fn deleting() -> Self {
        Self::new(ConditionType::Ready, false, ConditionReason::Deleting)
    }

    /// Not ready: the remote resource is absent.
    pub fn unavailable() -> Self {
        Self::new(ConditionType::Ready, false, ConditionReason::Unavailable)
    }

    /// Synced: the last pass succeeded.
    pub fn reconcile_success() -> Self {
        Self::new(ConditionType::Synced, true, ConditionReason::ReconcileSuccess)
    }

    /// Not synced: the last pass failed.
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        let mut condition = Self::new(ConditionType::Synced, false, ConditionReason::ReconcileError);
        condition.message = Some(message.into());
        condition
    }

    fn same_state(&self, other: &Condition) -> bool {
        self.status == other.status && self.reason == other.reason
    }
}

/// Observable status of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(deserialize = "O: Deserialize<'de>")
)]
pub struct ResourceStatus<O> {
    /// Current conditions, one per type.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Last observed remote state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<O>,
}

impl<O> Default for ResourceStatus<O> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            at_provider: None,
        }
    }
}

impl<O> ResourceStatus<O> {
    /// Sets a condition, replacing any condition of the same type.
    ///
    /// The transition time is kept when neither status nor reason changed.
    pub fn set_condition(&mut self, condition: Condition) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            Some(existing) if existing.same_state(&condition) => {
                existing.message = condition.message;
            }
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }
    }

    /// Returns the condition of the given type.
    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}

/// A declared external resource of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>, O: Deserialize<'de>"))]
pub struct ManagedRecord<P, O> {
    /// Metadata.
    pub metadata: RecordMeta,
    /// Desired state.
    pub spec: RecordSpec<P>,
    /// Observed state.
    #[serde(default)]
    pub status: ResourceStatus<O>,
}

impl<P, O> ManagedRecord<P, O> {
    /// Creates a record with default credentials and empty status.
    pub fn new(name: impl Into<String>, for_provider: P) -> Self {
        Self {
            metadata: RecordMeta {
                name: name.into(),
                ..RecordMeta::default()
            },
            spec: RecordSpec {
                for_provider,
                credential_ref: CredentialRef::default(),
                write_connection_secret_to: None,
            },
            status: ResourceStatus::default(),
        }
    }

    /// Sets the remote identifier.
    pub fn with_external_name(mut self, external_name: impl Into<String>) -> Self {
        self.metadata.external_name = Some(external_name.into());
        self
    }

    /// Sets the connection secret reference.
    pub fn with_connection_secret(mut self, secret: SecretReference) -> Self {
        self.spec.write_connection_secret_to = Some(secret);
        self
    }

    /// Sets the credential reference.
    pub fn with_credential_ref(mut self, credential_ref: CredentialRef) -> Self {
        self.spec.credential_ref = credential_ref;
        self
    }

    /// Desired parameters.
    pub fn params(&self) -> &P {
        &self.spec.for_provider
    }
}

/// Capability set the reconcile core needs from a record.
pub trait Managed: Send + Sync {
    /// Kind of resource.
    fn kind(&self) -> ResourceKind;

    /// Metadata.
    fn meta(&self) -> &RecordMeta;

    /// Mutable metadata.
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Account configuration reference.
    fn credential_ref(&self) -> &CredentialRef;

    /// Where connection details are published.
    fn connection_secret_ref(&self) -> Option<&SecretReference>;

    /// Sets a status condition.
    fn set_condition(&mut self, condition: Condition);

    /// Returns the condition of the given type.
    fn condition(&self, condition_type: ConditionType) -> Option<&Condition>;

    /// Record name.
    fn name(&self) -> &str {
        &self.meta().name
    }

    /// Remote identifier, if assigned.
    fn external_name(&self) -> Option<&str> {
        self.meta().external_name.as_deref()
    }

    /// Assigns the remote identifier.
    fn set_external_name(&mut self, external_name: String) {
        self.meta_mut().external_name = Some(external_name);
    }

    /// Returns true if the declarer asked for deletion.
    fn deletion_requested(&self) -> bool {
        self.meta().deletion_requested
    }
}

impl<P, O> Managed for ManagedRecord<P, O>
where
    P: ForProvider + Send + Sync,
    O: Send + Sync,
{
    fn kind(&self) -> ResourceKind {
        P::KIND
    }

    fn meta(&self) -> &RecordMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.metadata
    }

    fn credential_ref(&self) -> &CredentialRef {
        &self.spec.credential_ref
    }

    fn connection_secret_ref(&self) -> Option<&SecretReference> {
        self.spec.write_connection_secret_to.as_ref()
    }

    fn set_condition(&mut self, condition: Condition) {
        self.status.set_condition(condition);
    }

    fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.status.condition(condition_type)
    }
}
