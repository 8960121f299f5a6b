//! Domain webhooks, one per event type.
//!
//! A webhook is addressed by its domain and event type; the event type is
//! the remote identifier. Up to three URLs may be registered per event and
//! their order is preserved remotely.

use std::fmt;

use mailgun_reconcile_common::{ForProvider, ResourceKind};
use mailgun_transport::{ApiRequest, FormBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{optional_matches_opt, ordered_matches, RemoteResource};
use crate::paths::{fields, DOMAINS, V3, WEBHOOKS};

/// Event a webhook fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEvent {
    Accepted,
    Clicked,
    Complained,
    Delivered,
    Opened,
    PermanentFail,
    TemporaryFail,
    Unsubscribed,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::Accepted => "accepted",
            WebhookEvent::Clicked => "clicked",
            WebhookEvent::Complained => "complained",
            WebhookEvent::Delivered => "delivered",
            WebhookEvent::Opened => "opened",
            WebhookEvent::PermanentFail => "permanent_fail",
            WebhookEvent::TemporaryFail => "temporary_fail",
            WebhookEvent::Unsubscribed => "unsubscribed",
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookParameters {
    /// Domain the webhook belongs to.
    pub domain: String,
    pub event_type: WebhookEvent,
    /// Target URLs, in order.
    pub urls: Vec<String>,
    /// Basic-auth user presented to the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl ForProvider for WebhookParameters {
    const KIND: ResourceKind = ResourceKind::Webhook;
}

/// Webhook as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookObservation {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Webhook kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Webhook;

impl Webhook {
    fn segments<'a>(params: &'a WebhookParameters, event: &'a str) -> [&'a str; 5] {
        [V3, DOMAINS, params.domain.as_str(), WEBHOOKS, event]
    }
}

impl RemoteResource for Webhook {
    type Params = WebhookParameters;
    type Observation = WebhookObservation;

    const ENVELOPE: Option<&'static str> = Some("webhook");

    fn to_remote_payload(params: &WebhookParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push(fields::ID, params.event_type.as_str());
        form.extend_from(Self::to_update_payload(params));
        form
    }

    fn to_update_payload(params: &WebhookParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push_all(fields::URL, params.urls.iter().map(String::as_str))
            .push_opt(fields::USERNAME, params.username.as_ref());
        form
    }

    fn create_request(params: &WebhookParameters) -> ApiRequest {
        ApiRequest::post([V3, DOMAINS, params.domain.as_str(), WEBHOOKS])
            .with_form(Self::to_remote_payload(params))
    }

    fn get_request(params: &WebhookParameters, external_name: &str) -> ApiRequest {
        ApiRequest::get(Self::segments(params, external_name))
    }

    fn update_requests(
        params: &WebhookParameters,
        external_name: &str,
        _observed: Option<&WebhookObservation>,
    ) -> Vec<ApiRequest> {
        vec![ApiRequest::put(Self::segments(params, external_name))
            .with_form(Self::to_update_payload(params))]
    }

    fn delete_request(params: &WebhookParameters, external_name: &str) -> ApiRequest {
        ApiRequest::delete(Self::segments(params, external_name))
    }

    fn created_external_name(params: &WebhookParameters, _response: &Value) -> Result<String, String> {
        Ok(params.event_type.as_str().to_string())
    }

    fn is_up_to_date(observed: &WebhookObservation, params: &WebhookParameters) -> bool {
        ordered_matches(&params.urls, &observed.urls)
            && optional_matches_opt(params.username.as_ref(), observed.username.as_ref())
    }
}
