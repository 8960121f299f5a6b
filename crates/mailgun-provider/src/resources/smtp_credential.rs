//! SMTP credentials.
//!
//! The API discloses a credential's password only in the create response
//! and never returns it again, so these records are never read back. See
//! [`SmtpCredentialClient`](crate::SmtpCredentialClient) for how existence is
//! decided instead.

use mailgun_reconcile_common::{
    connection_details, ConnectionDetails, ForProvider, ManagedRecord, ResourceKind,
    SecretKeySelector,
};
use mailgun_transport::{ApiRequest, FormBody, Region, SMTP_PORT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::response_str;
use crate::paths::{fields, CREDENTIALS, DOMAINS, V3};

/// Connection detail keys published for a credential.
pub mod keys {
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const ENDPOINT: &str = "endpoint";
    pub const PORT: &str = "port";
}

/// Declared SMTP credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpCredentialParameters {
    pub domain: String,
    /// Login, either a local part or a full address.
    pub login: String,
    /// Password to set. Without one the remote generates it on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_ref: Option<SecretKeySelector>,
}

impl ForProvider for SmtpCredentialParameters {
    const KIND: ResourceKind = ResourceKind::SmtpCredential;
}

/// What is known about a credential without re-disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpCredentialObservation {
    pub login: String,
}

/// SMTP credential record.
pub type SmtpCredentialRecord = ManagedRecord<SmtpCredentialParameters, SmtpCredentialObservation>;

/// Full SMTP username for `params`.
pub fn username(params: &SmtpCredentialParameters) -> String {
    if params.login.contains('@') {
        params.login.clone()
    } else {
        format!("{}@{}", params.login, params.domain)
    }
}

/// Form payload for create.
pub fn to_remote_payload(params: &SmtpCredentialParameters, password: Option<&str>) -> FormBody {
    let mut form = FormBody::new();
    form.push(fields::LOGIN, params.login.as_str())
        .push_opt(fields::PASSWORD, password);
    form
}

pub fn create_request(params: &SmtpCredentialParameters, password: Option<&str>) -> ApiRequest {
    ApiRequest::post([V3, DOMAINS, params.domain.as_str(), CREDENTIALS])
        .with_form(to_remote_payload(params, password))
}

pub fn update_request(params: &SmtpCredentialParameters, login: &str, password: &str) -> ApiRequest {
    let mut form = FormBody::new();
    form.push(fields::PASSWORD, password);
    ApiRequest::put([V3, DOMAINS, params.domain.as_str(), CREDENTIALS, login]).with_form(form)
}

pub fn delete_request(params: &SmtpCredentialParameters, login: &str) -> ApiRequest {
    ApiRequest::delete([V3, DOMAINS, params.domain.as_str(), CREDENTIALS, login])
}

/// Password in effect after a create: the one supplied, else the one the
/// remote generated and returned.
pub fn created_password(supplied: Option<&str>, response: &Value) -> Result<String, String> {
    match supplied {
        Some(password) => Ok(password.to_string()),
        None => response_str(response, "/password"),
    }
}

/// Connection details for an SMTP client.
pub fn credential_details(username: &str, password: &str, region: Region) -> ConnectionDetails {
    let port = SMTP_PORT.to_string();
    connection_details([
        (keys::USERNAME, username),
        (keys::PASSWORD, password),
        (keys::ENDPOINT, region.smtp_endpoint()),
        (keys::PORT, port.as_str()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn params() -> SmtpCredentialParameters {
        SmtpCredentialParameters {
            domain: "mg.example.com".to_string(),
            login: "alerts".to_string(),
            password_secret_ref: None,
        }
    }

    #[test]
    fn test_username() {
        assert_eq!(username(&params()), "alerts@mg.example.com");

        let mut params = params();
        params.login = "alerts@mg.example.com".to_string();
        assert_eq!(username(&params), "alerts@mg.example.com");
    }

    #[test]
    fn test_requests() {
        let create = create_request(&params(), None);
        assert_eq!(create.path(), "/v3/domains/mg.example.com/credentials");
        assert_eq!(create.form.get(fields::LOGIN), Some("alerts"));
        assert!(!create.form.has_field(fields::PASSWORD));

        let update = update_request(&params(), "alerts", "s3cret");
        assert_eq!(update.path(), "/v3/domains/mg.example.com/credentials/alerts");
        assert_eq!(update.form.get(fields::PASSWORD), Some("s3cret"));
    }

    #[test]
    fn test_created_password() {
        let generated = json!({"message": "Created 1 credentials pair(s)", "password": "gen-123"});
        assert_eq!(created_password(None, &generated).unwrap(), "gen-123");
        assert_eq!(created_password(Some("mine"), &generated).unwrap(), "mine");
        assert!(created_password(None, &json!({"message": "ok"})).is_err());
    }

    #[test]
    fn test_credential_details() {
        let details = credential_details("alerts@mg.example.com", "pw", Region::Eu);
        assert_eq!(details[keys::ENDPOINT], b"smtp.eu.mailgun.org".to_vec());
        assert_eq!(details[keys::PORT], b"587".to_vec());
        assert_eq!(details[keys::PASSWORD], b"pw".to_vec());
    }
}
