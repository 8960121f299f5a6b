//! Stored templates and their active version.
//!
//! A template's description lives on the template itself; content, engine
//! and tag live on its active version. Drift in the description is fixed in
//! place, drift in the version fields publishes a new active version.

use chrono::Utc;
use mailgun_reconcile_common::{ForProvider, ResourceKind};
use mailgun_transport::{ApiRequest, FormBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{optional_matches, optional_matches_opt, RemoteResource};
use crate::paths::{fields, ACTIVE, TEMPLATES, V3, VERSIONS};

/// Declared template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateParameters {
    pub domain: String,
    /// Template name, lower-cased remotely.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Content of the active version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Rendering engine, e.g. `handlebars`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Tag of the active version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Comment attached to new versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ForProvider for TemplateParameters {
    const KIND: ResourceKind = ResourceKind::Template;
}

/// A template version as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVersion {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub active: bool,
}

/// Template as returned by the API, with its active version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateObservation {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<TemplateVersion>,
}

/// Template kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Template;

impl Template {
    fn description_matches(observed: &TemplateObservation, params: &TemplateParameters) -> bool {
        optional_matches(params.description.as_ref(), &observed.description)
    }

    fn version_matches(observed: &TemplateObservation, params: &TemplateParameters) -> bool {
        let version = observed.version.as_ref();
        optional_matches_opt(params.template.as_ref(), version.map(|v| &v.template))
            && optional_matches_opt(params.engine.as_ref(), version.map(|v| &v.engine))
            && optional_matches_opt(params.tag.as_ref(), version.map(|v| &v.tag))
    }

    /// Form for a new active version.
    ///
    /// Without a declared tag one is generated, since tags must be unique per
    /// template. Without declared content the observed content is carried
    /// over, so an engine or tag change alone still yields a valid version.
    pub fn version_payload(params: &TemplateParameters, observed: Option<&TemplateVersion>) -> FormBody {
        let tag = params
            .tag
            .clone()
            .unwrap_or_else(|| format!("v{}", Utc::now().format("%Y%m%d%H%M%S")));
        let content = params
            .template
            .as_ref()
            .or_else(|| observed.map(|v| &v.template));

        let mut form = FormBody::new();
        form.push(fields::TAG, tag)
            .push_opt(fields::TEMPLATE, content)
            .push_opt(fields::ENGINE, params.engine.as_ref())
            .push_opt(fields::COMMENT, params.comment.as_ref())
            .push(fields::ACTIVE, "yes");
        form
    }
}

impl RemoteResource for Template {
    type Params = TemplateParameters;
    type Observation = TemplateObservation;

    const ENVELOPE: Option<&'static str> = Some("template");

    fn to_remote_payload(params: &TemplateParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push(fields::NAME, params.name.as_str())
            .push_opt(fields::DESCRIPTION, params.description.as_ref())
            .push_opt(fields::TEMPLATE, params.template.as_ref())
            .push_opt(fields::ENGINE, params.engine.as_ref())
            .push_opt(fields::TAG, params.tag.as_ref())
            .push_opt(fields::COMMENT, params.comment.as_ref());
        form
    }

    fn to_update_payload(params: &TemplateParameters) -> FormBody {
        let mut form = FormBody::new();
        form.push_opt(fields::DESCRIPTION, params.description.as_ref());
        form
    }

    fn create_request(params: &TemplateParameters) -> ApiRequest {
        ApiRequest::post([V3, params.domain.as_str(), TEMPLATES])
            .with_form(Self::to_remote_payload(params))
    }

    fn get_request(params: &TemplateParameters, external_name: &str) -> ApiRequest {
        ApiRequest::get([V3, params.domain.as_str(), TEMPLATES, external_name])
            .with_query(ACTIVE, "yes")
    }

    fn update_requests(
        params: &TemplateParameters,
        external_name: &str,
        observed: Option<&TemplateObservation>,
    ) -> Vec<ApiRequest> {
        let domain = params.domain.as_str();
        let mut requests = Vec::new();

        let description_drifted = params.description.is_some()
            && observed.map_or(true, |o| !Self::description_matches(o, params));
        if description_drifted {
            requests.push(
                ApiRequest::put([V3, domain, TEMPLATES, external_name])
                    .with_form(Self::to_update_payload(params)),
            );
        }

        let version_drifted = match observed {
            Some(o) => !Self::version_matches(o, params),
            None => params.template.is_some(),
        };
        if version_drifted {
            let active = observed.and_then(|o| o.version.as_ref());
            requests.push(
                ApiRequest::post([V3, domain, TEMPLATES, external_name, VERSIONS])
                    .with_form(Self::version_payload(params, active)),
            );
        }

        requests
    }

    fn delete_request(params: &TemplateParameters, external_name: &str) -> ApiRequest {
        ApiRequest::delete([V3, params.domain.as_str(), TEMPLATES, external_name])
    }

    fn created_external_name(params: &TemplateParameters, _response: &Value) -> Result<String, String> {
        Ok(params.name.to_lowercase())
    }

    fn is_up_to_date(observed: &TemplateObservation, params: &TemplateParameters) -> bool {
        Self::description_matches(observed, params) && Self::version_matches(observed, params)
    }
}
