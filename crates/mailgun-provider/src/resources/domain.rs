//! Sending domains.
//!
//! The domain name is the remote identifier. DKIM settings and dedicated IPs
//! are accepted on create only; spam action, wildcard and tracking scheme
//! can be updated in place.

use std::fmt;

use mailgun_reconcile_common::{ForProvider, ResourceKind};
use mailgun_transport::{ApiRequest, FormBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{optional_matches, optional_matches_opt, RemoteResource};
use crate::paths::{fields, DOMAINS, V3, V4};

/// What the remote does with messages flagged as spam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpamAction {
    Disabled,
    Block,
    Tag,
}

impl SpamAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpamAction::Disabled => "disabled",
            SpamAction::Block => "block",
            SpamAction::Tag => "tag",
        }
    }
}

impl fmt::Display for SpamAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheme used for tracking links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebScheme {
    Http,
    Https,
}

impl WebScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebScheme::Http => "http",
            WebScheme::Https => "https",
        }
    }
}

impl fmt::Display for WebScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainParameters {
    /// Fully qualified domain name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spam_action: Option<SpamAction>,
    /// Accept mail for subdomains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_scheme: Option<WebScheme>,
    /// DKIM key length in bits (1024 or 2048). Create only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dkim_key_size: Option<u32>,
    /// Create only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_dkim_authority: Option<bool>,
    /// Dedicated IPs to assign. Create only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<String>,
}

impl DomainParameters {
    /// Domain with every optional setting left to the remote default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spam_action: None,
            wildcard: None,
            web_scheme: None,
            dkim_key_size: None,
            force_dkim_authority: None,
            ips: Vec::new(),
        }
    }
}

impl ForProvider for DomainParameters {
    const KIND: ResourceKind = ResourceKind::Domain;
}

/// Domain as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainObservation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spam_action: Option<SpamAction>,
    #[serde(default)]
    pub wildcard: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_scheme: Option<WebScheme>,
    /// Verification state, e.g. `unverified` or `active`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Domain kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Domain;

impl RemoteResource for Domain {
    type Params = DomainParameters;
    type Observation = DomainObservation;

    const ENVELOPE: Option<&'static str> = Some("domain");

    fn to_remote_payload(params: &DomainParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push(fields::NAME, params.name.as_str())
            .push_opt(fields::SPAM_ACTION, params.spam_action)
            .push_opt(fields::WILDCARD, params.wildcard)
            .push_opt(fields::WEB_SCHEME, params.web_scheme)
            .push_opt(fields::DKIM_KEY_SIZE, params.dkim_key_size)
            .push_opt(fields::FORCE_DKIM_AUTHORITY, params.force_dkim_authority);
        if !params.ips.is_empty() {
            form.push(fields::IPS, params.ips.join(","));
        }
        form
    }

    fn to_update_payload(params: &DomainParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push_opt(fields::SPAM_ACTION, params.spam_action)
            .push_opt(fields::WILDCARD, params.wildcard)
            .push_opt(fields::WEB_SCHEME, params.web_scheme);
        form
    }

    fn create_request(params: &DomainParameters) -> ApiRequest {
        ApiRequest::post([V4, DOMAINS]).with_form(Self::to_remote_payload(params))
    }

    fn get_request(_params: &DomainParameters, external_name: &str) -> ApiRequest {
        ApiRequest::get([V4, DOMAINS, external_name])
    }

    fn update_requests(
        params: &DomainParameters,
        external_name: &str,
        _observed: Option<&DomainObservation>,
    ) -> Vec<ApiRequest> {
        vec![ApiRequest::put([V4, DOMAINS, external_name]).with_form(Self::to_update_payload(params))]
    }

    fn delete_request(_params: &DomainParameters, external_name: &str) -> ApiRequest {
        ApiRequest::delete([V3, DOMAINS, external_name])
    }

    fn created_external_name(params: &DomainParameters, _response: &Value) -> Result<String, String> {
        Ok(params.name.clone())
    }

    fn is_up_to_date(observed: &DomainObservation, params: &DomainParameters) -> bool {
        optional_matches_opt(params.spam_action.as_ref(), observed.spam_action.as_ref())
            && optional_matches(params.wildcard.as_ref(), &observed.wildcard)
            && optional_matches_opt(params.web_scheme.as_ref(), observed.web_scheme.as_ref())
    }
}
