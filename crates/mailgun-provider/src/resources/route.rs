//! Routes: inbound message filters with an ordered action list.
//!
//! The route id is assigned by the server on create. Actions are evaluated
//! in order remotely, so they are compared positionally.

use mailgun_reconcile_common::{ForProvider, ResourceKind};
use mailgun_transport::{ApiRequest, FormBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{optional_matches, ordered_matches, response_str, RemoteResource};
use crate::paths::{fields, ROUTES, V3};

/// Declared route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteParameters {
    /// Filter expression, e.g. `match_recipient('a@b.com')`.
    pub expression: String,
    /// Actions, in evaluation order.
    pub actions: Vec<String>,
    /// Lower runs first. Remote default is 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ForProvider for RouteParameters {
    const KIND: ResourceKind = ResourceKind::Route;
}

/// Route as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteObservation {
    pub id: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub description: String,
    pub expression: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Route kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Route;

impl RemoteResource for Route {
    type Params = RouteParameters;
    type Observation = RouteObservation;

    const ENVELOPE: Option<&'static str> = Some("route");

    fn to_remote_payload(params: &RouteParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push_opt(fields::PRIORITY, params.priority)
            .push_opt(fields::DESCRIPTION, params.description.as_ref())
            .push(fields::EXPRESSION, params.expression.as_str())
            .push_all(fields::ACTION, params.actions.iter().map(String::as_str));
        form
    }

    fn create_request(params: &RouteParameters) -> ApiRequest {
        ApiRequest::post([V3, ROUTES]).with_form(Self::to_remote_payload(params))
    }

    fn get_request(_params: &RouteParameters, external_name: &str) -> ApiRequest {
        ApiRequest::get([V3, ROUTES, external_name])
    }

    fn update_requests(
        params: &RouteParameters,
        external_name: &str,
        _observed: Option<&RouteObservation>,
    ) -> Vec<ApiRequest> {
        vec![ApiRequest::put([V3, ROUTES, external_name]).with_form(Self::to_update_payload(params))]
    }

    fn delete_request(_params: &RouteParameters, external_name: &str) -> ApiRequest {
        ApiRequest::delete([V3, ROUTES, external_name])
    }

    fn created_external_name(_params: &RouteParameters, response: &Value) -> Result<String, String> {
        response_str(response, "/route/id")
    }

    fn is_up_to_date(observed: &RouteObservation, params: &RouteParameters) -> bool {
        observed.expression == params.expression
            && ordered_matches(&params.actions, &observed.actions)
            && optional_matches(params.priority.as_ref(), &observed.priority)
            && optional_matches(params.description.as_ref(), &observed.description)
    }
}
