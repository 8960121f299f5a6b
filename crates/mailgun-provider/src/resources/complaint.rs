//! Complaint suppression entries. Nothing about them is mutable.

use mailgun_reconcile_common::{ForProvider, ResourceKind};
use mailgun_transport::{ApiRequest, FormBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RemoteResource;
use crate::paths::{fields, COMPLAINTS, V3};

/// Declared complaint entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintParameters {
    pub domain: String,
    pub address: String,
}

impl ForProvider for ComplaintParameters {
    const KIND: ResourceKind = ResourceKind::Complaint;
}

/// Complaint entry as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintObservation {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Complaint kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Complaint;

impl RemoteResource for Complaint {
    type Params = ComplaintParameters;
    type Observation = ComplaintObservation;

    const ENVELOPE: Option<&'static str> = None;

    fn to_remote_payload(params: &ComplaintParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push(fields::ADDRESS, params.address.as_str());
        form
    }

    fn create_request(params: &ComplaintParameters) -> ApiRequest {
        ApiRequest::post([V3, params.domain.as_str(), COMPLAINTS])
            .with_form(Self::to_remote_payload(params))
    }

    fn get_request(params: &ComplaintParameters, external_name: &str) -> ApiRequest {
        ApiRequest::get([V3, params.domain.as_str(), COMPLAINTS, external_name])
    }

    fn update_requests(
        _params: &ComplaintParameters,
        _external_name: &str,
        _observed: Option<&ComplaintObservation>,
    ) -> Vec<ApiRequest> {
        Vec::new()
    }

    fn delete_request(params: &ComplaintParameters, external_name: &str) -> ApiRequest {
        ApiRequest::delete([V3, params.domain.as_str(), COMPLAINTS, external_name])
    }

    fn created_external_name(params: &ComplaintParameters, _response: &Value) -> Result<String, String> {
        Ok(params.address.clone())
    }

    fn is_up_to_date(_observed: &ComplaintObservation, _params: &ComplaintParameters) -> bool {
        true
    }
}
