//! Records of every kind in one collection.
//!
//! A records file is a YAML sequence, each entry tagged with its `kind`:
//!
//! ```yaml
//! - kind: Route
//!   metadata:
//!     name: catch-all
//!   spec:
//!     forProvider:
//!       expression: catch_all()
//!       actions: ["stop()"]
//! ```

use std::path::Path;

use mailgun_reconcile_common::{
    Condition, ConditionType, CredentialRef, Managed, RecordMeta, ResourceKind, SecretReference,
};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::resources::bounce::Bounce;
use crate::resources::complaint::Complaint;
use crate::resources::domain::Domain;
use crate::resources::mailing_list::MailingList;
use crate::resources::route::Route;
use crate::resources::smtp_credential::SmtpCredentialRecord;
use crate::resources::template::Template;
use crate::resources::unsubscribe::Unsubscribe;
use crate::resources::webhook::Webhook;
use crate::resources::KindRecord;

/// A record of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    Domain(KindRecord<Domain>),
    MailingList(KindRecord<MailingList>),
    Route(KindRecord<Route>),
    Webhook(KindRecord<Webhook>),
    Template(KindRecord<Template>),
    #[serde(rename = "SMTPCredential")]
    SmtpCredential(SmtpCredentialRecord),
    Bounce(KindRecord<Bounce>),
    Complaint(KindRecord<Complaint>),
    Unsubscribe(KindRecord<Unsubscribe>),
}

/// Evaluates `$body` with `$record` bound to the inner record.
macro_rules! each_kind {
    ($value:expr, $record:ident => $body:expr) => {
        match $value {
            Resource::Domain($record) => $body,
            Resource::MailingList($record) => $body,
            Resource::Route($record) => $body,
            Resource::Webhook($record) => $body,
            Resource::Template($record) => $body,
            Resource::SmtpCredential($record) => $body,
            Resource::Bounce($record) => $body,
            Resource::Complaint($record) => $body,
            Resource::Unsubscribe($record) => $body,
        }
    };
}

impl Managed for Resource {
    fn kind(&self) -> ResourceKind {
        each_kind!(self, r => r.kind())
    }

    fn meta(&self) -> &RecordMeta {
        each_kind!(self, r => &r.metadata)
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        each_kind!(self, r => &mut r.metadata)
    }

    fn credential_ref(&self) -> &CredentialRef {
        each_kind!(self, r => &r.spec.credential_ref)
    }

    fn connection_secret_ref(&self) -> Option<&SecretReference> {
        each_kind!(self, r => r.spec.write_connection_secret_to.as_ref())
    }

    fn set_condition(&mut self, condition: Condition) {
        each_kind!(self, r => r.status.set_condition(condition))
    }

    fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        each_kind!(self, r => r.status.condition(condition_type))
    }
}

macro_rules! impl_from_record {
    ($($variant:ident => $record:ty),* $(,)?) => {
        $(
            impl From<$record> for Resource {
                fn from(record: $record) -> Self {
                    Resource::$variant(record)
                }
            }
        )*
    };
}

impl_from_record! {
    Domain => KindRecord<Domain>,
    MailingList => KindRecord<MailingList>,
    Route => KindRecord<Route>,
    Webhook => KindRecord<Webhook>,
    Template => KindRecord<Template>,
    SmtpCredential => SmtpCredentialRecord,
    Bounce => KindRecord<Bounce>,
    Complaint => KindRecord<Complaint>,
    Unsubscribe => KindRecord<Unsubscribe>,
}

/// Reads a records file.
pub fn load_records(path: impl AsRef<Path>) -> ProviderResult<Vec<Resource>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ProviderError::io(path, e))?;
    serde_yaml::from_str(&text).map_err(|e| ProviderError::yaml(path, e))
}

/// Writes records back, replacing the file atomically.
pub fn save_records(path: impl AsRef<Path>, records: &[Resource]) -> ProviderResult<()> {
    let path = path.as_ref();
    let text = serde_yaml::to_string(records).map_err(|e| ProviderError::yaml(path, e))?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, text).map_err(|e| ProviderError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| ProviderError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::route::RouteParameters;
    use crate::resources::smtp_credential::SmtpCredentialParameters;
    use mailgun_reconcile_common::ManagedRecord;
    use pretty_assertions::assert_eq;

    const RECORDS: &str = r#"
- kind: Route
  metadata:
    name: catch-all
    externalName: r-1
  spec:
    forProvider:
      expression: catch_all()
      actions: ["forward(\"ops@example.com\")", "stop()"]
      priority: 1
- kind: SMTPCredential
  metadata:
    name: alerts
  spec:
    forProvider:
      domain: mg.example.com
      login: alerts
    credentialRef:
      name: marketing
    writeConnectionSecretTo:
      name: alerts-smtp
      namespace: mail
- kind: Webhook
  metadata:
    name: delivered
    deletionRequested: true
  spec:
    forProvider:
      domain: mg.example.com
      eventType: delivered
      urls: ["https://hooks.example.com/mg"]
"#;

    #[test]
    fn test_parse_records() {
        let records: Vec<Resource> = serde_yaml::from_str(RECORDS).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].kind(), ResourceKind::Route);
        assert_eq!(records[0].external_name(), Some("r-1"));

        assert_eq!(records[1].kind(), ResourceKind::SmtpCredential);
        assert_eq!(records[1].credential_ref().name, "marketing");
        assert_eq!(
            records[1].connection_secret_ref(),
            Some(&SecretReference::new("alerts-smtp", "mail"))
        );

        assert!(records[2].deletion_requested());
        assert_eq!(records[2].credential_ref(), &CredentialRef::default());
    }

    #[test]
    fn test_status_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.yaml");

        let mut route: Resource = ManagedRecord::new(
            "catch-all",
            RouteParameters {
                expression: "catch_all()".to_string(),
                actions: vec!["stop()".to_string()],
                priority: None,
                description: None,
            },
        )
        .into();
        route.set_external_name("r-9".to_string());
        route.set_condition(Condition::available());

        let credential: Resource = ManagedRecord::new(
            "alerts",
            SmtpCredentialParameters {
                domain: "mg.example.com".to_string(),
                login: "alerts".to_string(),
                password_secret_ref: None,
            },
        )
        .into();

        let records = vec![route, credential];
        save_records(&path, &records).unwrap();
        assert_eq!(load_records(&path).unwrap(), records);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = serde_yaml::from_str::<Vec<Resource>>(
            "- kind: Dns\n  metadata: {name: x}\n  spec: {forProvider: {}}\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Dns"));
    }
}
