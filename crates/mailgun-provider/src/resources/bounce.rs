//! Bounce suppression entries.
//!
//! Posting an existing address replaces its entry, so update is a re-post.

use mailgun_reconcile_common::{ForProvider, ResourceKind};
use mailgun_transport::{ApiRequest, FormBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{optional_matches_opt, string_or_number, RemoteResource};
use crate::paths::{fields, BOUNCES, V3};

/// Declared bounce entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BounceParameters {
    pub domain: String,
    pub address: String,
    /// SMTP error code, remote default `550`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ForProvider for BounceParameters {
    const KIND: ResourceKind = ResourceKind::Bounce;
}

/// Bounce entry as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceObservation {
    pub address: String,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Bounce kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bounce;

impl RemoteResource for Bounce {
    type Params = BounceParameters;
    type Observation = BounceObservation;

    const ENVELOPE: Option<&'static str> = None;

    fn to_remote_payload(params: &BounceParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push(fields::ADDRESS, params.address.as_str())
            .push_opt(fields::CODE, params.code.as_ref())
            .push_opt(fields::ERROR, params.error.as_ref());
        form
    }

    fn create_request(params: &BounceParameters) -> ApiRequest {
        ApiRequest::post([V3, params.domain.as_str(), BOUNCES])
            .with_form(Self::to_remote_payload(params))
    }

    fn get_request(params: &BounceParameters, external_name: &str) -> ApiRequest {
        ApiRequest::get([V3, params.domain.as_str(), BOUNCES, external_name])
    }

    fn update_requests(
        params: &BounceParameters,
        _external_name: &str,
        _observed: Option<&BounceObservation>,
    ) -> Vec<ApiRequest> {
        vec![Self::create_request(params)]
    }

    fn delete_request(params: &BounceParameters, external_name: &str) -> ApiRequest {
        ApiRequest::delete([V3, params.domain.as_str(), BOUNCES, external_name])
    }

    fn created_external_name(params: &BounceParameters, _response: &Value) -> Result<String, String> {
        Ok(params.address.clone())
    }

    fn is_up_to_date(observed: &BounceObservation, params: &BounceParameters) -> bool {
        optional_matches_opt(params.code.as_ref(), observed.code.as_ref())
            && optional_matches_opt(params.error.as_ref(), observed.error.as_ref())
    }
}
