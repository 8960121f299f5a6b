//! Mailing lists, addressed by their list address.

use std::fmt;

use mailgun_reconcile_common::{ForProvider, ResourceKind};
use mailgun_transport::{ApiRequest, FormBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{optional_matches, optional_matches_opt, RemoteResource};
use crate::paths::{fields, LISTS, V3};

/// Who may post to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Readonly,
    Members,
    Everyone,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessLevel::Readonly => "readonly",
            AccessLevel::Members => "members",
            AccessLevel::Everyone => "everyone",
        })
    }
}

/// Where replies go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyPreference {
    List,
    Sender,
}

impl fmt::Display for ReplyPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReplyPreference::List => "list",
            ReplyPreference::Sender => "sender",
        })
    }
}

/// Declared mailing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingListParameters {
    /// List address, e.g. `devs@mg.example.com`.
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_preference: Option<ReplyPreference>,
}

impl ForProvider for MailingListParameters {
    const KIND: ResourceKind = ResourceKind::MailingList;
}

/// Mailing list as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailingListObservation {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_preference: Option<ReplyPreference>,
    #[serde(default)]
    pub members_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Mailing list kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailingList;

impl RemoteResource for MailingList {
    type Params = MailingListParameters;
    type Observation = MailingListObservation;

    const ENVELOPE: Option<&'static str> = Some("list");

    fn to_remote_payload(params: &MailingListParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push(fields::ADDRESS, params.address.as_str());
        form.extend_from(Self::to_update_payload(params));
        form
    }

    fn to_update_payload(params: &MailingListParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push_opt(fields::NAME, params.name.as_ref())
            .push_opt(fields::DESCRIPTION, params.description.as_ref())
            .push_opt(fields::ACCESS_LEVEL, params.access_level)
            .push_opt(fields::REPLY_PREFERENCE, params.reply_preference);
        form
    }

    fn create_request(params: &MailingListParameters) -> ApiRequest {
        ApiRequest::post([V3, LISTS]).with_form(Self::to_remote_payload(params))
    }

    fn get_request(_params: &MailingListParameters, external_name: &str) -> ApiRequest {
        ApiRequest::get([V3, LISTS, external_name])
    }

    fn update_requests(
        params: &MailingListParameters,
        external_name: &str,
        _observed: Option<&MailingListObservation>,
    ) -> Vec<ApiRequest> {
        vec![ApiRequest::put([V3, LISTS, external_name]).with_form(Self::to_update_payload(params))]
    }

    fn delete_request(_params: &MailingListParameters, external_name: &str) -> ApiRequest {
        ApiRequest::delete([V3, LISTS, external_name])
    }

    fn created_external_name(params: &MailingListParameters, _response: &Value) -> Result<String, String> {
        Ok(params.address.clone())
    }

    fn is_up_to_date(observed: &MailingListObservation, params: &MailingListParameters) -> bool {
        optional_matches(params.name.as_ref(), &observed.name)
            && optional_matches(params.description.as_ref(), &observed.description)
            && optional_matches_opt(params.access_level.as_ref(), observed.access_level.as_ref())
            && optional_matches_opt(
                params.reply_preference.as_ref(),
                observed.reply_preference.as_ref(),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> MailingListParameters {
        MailingListParameters {
            address: "devs@mg.example.com".to_string(),
            name: Some("Developers".to_string()),
            description: None,
            access_level: Some(AccessLevel::Members),
            reply_preference: None,
        }
    }

    #[test]
    fn test_payloads() {
        let create = MailingList::to_remote_payload(&params());
        assert_eq!(create.get(fields::ADDRESS), Some("devs@mg.example.com"));
        assert_eq!(create.get(fields::ACCESS_LEVEL), Some("members"));
        assert!(!create.has_field(fields::DESCRIPTION));

        let update = MailingList::to_update_payload(&params());
        assert!(!update.has_field(fields::ADDRESS));
        assert_eq!(update.get(fields::NAME), Some("Developers"));
    }

    #[test]
    fn test_address_is_single_segment() {
        let get = MailingList::get_request(&params(), "devs@mg.example.com");
        assert_eq!(get.segments, vec!["v3", "lists", "devs@mg.example.com"]);
    }

    #[test]
    fn test_drift() {
        let observed = MailingList::to_observation(&json!({
            "list": {
                "address": "devs@mg.example.com",
                "name": "Developers",
                "description": "anything",
                "access_level": "members",
                "reply_preference": "list",
                "members_count": 3
            }
        }))
        .unwrap();
        assert!(MailingList::is_up_to_date(&observed, &params()));

        let mut params = params();
        params.reply_preference = Some(ReplyPreference::Sender);
        assert!(!MailingList::is_up_to_date(&observed, &params));
    }
}
