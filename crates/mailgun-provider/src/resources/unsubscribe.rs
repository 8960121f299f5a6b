//! Unsubscribe suppression entries, optionally scoped to tags.

use mailgun_reconcile_common::{ForProvider, ResourceKind};
use mailgun_transport::{ApiRequest, FormBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ordered_matches, RemoteResource};
use crate::paths::{fields, UNSUBSCRIBES, V3};

/// Declared unsubscribe entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeParameters {
    pub domain: String,
    pub address: String,
    /// Tags the address is unsubscribed from; remote default is `*`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ForProvider for UnsubscribeParameters {
    const KIND: ResourceKind = ResourceKind::Unsubscribe;
}

/// Unsubscribe entry as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeObservation {
    pub address: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Unsubscribe kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsubscribe;

impl RemoteResource for Unsubscribe {
    type Params = UnsubscribeParameters;
    type Observation = UnsubscribeObservation;

    const ENVELOPE: Option<&'static str> = None;

    fn to_remote_payload(params: &UnsubscribeParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push(fields::ADDRESS, params.address.as_str());
        if let Some(tags) = &params.tags {
            form.push_all(fields::TAG, tags.iter().map(String::as_str));
        }
        form
    }

    fn create_request(params: &UnsubscribeParameters) -> ApiRequest {
        ApiRequest::post([V3, params.domain.as_str(), UNSUBSCRIBES])
            .with_form(Self::to_remote_payload(params))
    }

    fn get_request(params: &UnsubscribeParameters, external_name: &str) -> ApiRequest {
        ApiRequest::get([V3, params.domain.as_str(), UNSUBSCRIBES, external_name])
    }

    fn update_requests(
        params: &UnsubscribeParameters,
        _external_name: &str,
        _observed: Option<&UnsubscribeObservation>,
    ) -> Vec<ApiRequest> {
        vec![Self::create_request(params)]
    }

    fn delete_request(params: &UnsubscribeParameters, external_name: &str) -> ApiRequest {
        ApiRequest::delete([V3, params.domain.as_str(), UNSUBSCRIBES, external_name])
    }

    fn created_external_name(params: &UnsubscribeParameters, _response: &Value) -> Result<String, String> {
        Ok(params.address.clone())
    }

    fn is_up_to_date(observed: &UnsubscribeObservation, params: &UnsubscribeParameters) -> bool {
        params
            .tags
            .as_ref()
            .map_or(true, |tags| ordered_matches(tags, &observed.tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn observed() -> UnsubscribeObservation {
        Unsubscribe::to_observation(&json!({
            "address": "bye@example.org",
            "tags": ["newsletter", "promo"]
        }))
        .unwrap()
    }

    #[test]
    fn test_tags_are_positional() {
        let mut params = UnsubscribeParameters {
            domain: "mg.example.com".to_string(),
            address: "bye@example.org".to_string(),
            tags: None,
        };
        assert!(Unsubscribe::is_up_to_date(&observed(), &params));

        params.tags = Some(vec!["newsletter".to_string(), "promo".to_string()]);
        assert!(Unsubscribe::is_up_to_date(&observed(), &params));

        params.tags = Some(vec!["promo".to_string(), "newsletter".to_string()]);
        assert!(!Unsubscribe::is_up_to_date(&observed(), &params));
    }

    #[test]
    fn test_payload_repeats_tag() {
        let params = UnsubscribeParameters {
            domain: "mg.example.com".to_string(),
            address: "bye@example.org".to_string(),
            tags: Some(vec!["a".to_string(), "b".to_string()]),
        };
        let form = Unsubscribe::to_remote_payload(&params);
        assert_eq!(form.get_all(fields::TAG), vec!["a", "b"]);
    }
}
