//! Per-kind codecs and drift comparators.
//!
//! Every kind except SMTP credentials implements [`RemoteResource`]: request
//! builders for the four remote operations, the form payload built from the
//! declared parameters, decoding of the Get response into an observation, and
//! the comparator deciding whether that observation satisfies the
//! declaration. SMTP credentials cannot be read back and live in
//! [`smtp_credential`] with their own client.
//!
//! Comparator rules shared by every kind:
//!
//! - fields that identify the resource are never compared
//! - an optional field the declaration leaves unset never counts as drift
//! - ordered lists are compared positionally, so reordering is drift

use std::fmt;

use mailgun_reconcile_common::{ConnectionDetails, ForProvider, ManagedRecord};
use mailgun_transport::{ApiRequest, FormBody};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub mod bounce;
pub mod complaint;
pub mod domain;
pub mod mailing_list;
pub mod route;
pub mod smtp_credential;
pub mod template;
pub mod unsubscribe;
pub mod webhook;

/// Record type for a kind.
pub type KindRecord<K> =
    ManagedRecord<<K as RemoteResource>::Params, <K as RemoteResource>::Observation>;

/// Codec, comparator and request builders for one readable resource kind.
pub trait RemoteResource: Send + Sync + 'static {
    /// Declared parameters.
    type Params: ForProvider + Clone + fmt::Debug + Send + Sync + 'static;

    /// Decoded remote state.
    type Observation: DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    /// Key wrapping the object in a Get response, `None` for bare objects.
    const ENVELOPE: Option<&'static str>;

    /// Form payload sent on create.
    fn to_remote_payload(params: &Self::Params) -> FormBody;

    /// Form payload sent on update. Unset optional fields are left out.
    fn to_update_payload(params: &Self::Params) -> FormBody {
        Self::to_remote_payload(params)
    }

    /// Create request.
    fn create_request(params: &Self::Params) -> ApiRequest;

    /// Get request for the resource named `external_name`.
    fn get_request(params: &Self::Params, external_name: &str) -> ApiRequest;

    /// Requests bringing the remote resource in line with `params`.
    ///
    /// `observed` is the observation made earlier in the same pass. An empty
    /// list means the kind has nothing mutable.
    fn update_requests(
        params: &Self::Params,
        external_name: &str,
        observed: Option<&Self::Observation>,
    ) -> Vec<ApiRequest>;

    /// Delete request.
    fn delete_request(params: &Self::Params, external_name: &str) -> ApiRequest;

    /// Remote identifier assigned by a successful create.
    fn created_external_name(params: &Self::Params, response: &Value) -> Result<String, String>;

    /// Decodes a Get response.
    fn to_observation(payload: &Value) -> Result<Self::Observation, String> {
        decode(payload, Self::ENVELOPE)
    }

    /// Returns true if `observed` satisfies `params`.
    fn is_up_to_date(observed: &Self::Observation, params: &Self::Params) -> bool;

    /// Connection details derived from an observation.
    fn connection_details(_observed: &Self::Observation) -> ConnectionDetails {
        ConnectionDetails::new()
    }
}

/// Decodes `payload`, or the object under `envelope`, into `T`.
pub fn decode<T: DeserializeOwned>(payload: &Value, envelope: Option<&str>) -> Result<T, String> {
    let object = match envelope {
        Some(key) => payload
            .get(key)
            .ok_or_else(|| format!("missing '{}' object", key))?,
        None => payload,
    };
    T::deserialize(object).map_err(|e| e.to_string())
}

/// Reads a string at `pointer` in a create response.
pub fn response_str(response: &Value, pointer: &str) -> Result<String, String> {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("missing '{}' in create response", pointer))
}

/// An unset declaration never drifts.
pub fn optional_matches<T: PartialEq>(desired: Option<&T>, observed: &T) -> bool {
    desired.map_or(true, |d| d == observed)
}

/// Like [`optional_matches`] for fields the remote may also omit.
pub fn optional_matches_opt<T: PartialEq>(desired: Option<&T>, observed: Option<&T>) -> bool {
    desired.map_or(true, |d| observed == Some(d))
}

/// Positional comparison: same length, then element by element.
pub fn ordered_matches<T: PartialEq>(desired: &[T], observed: &[T]) -> bool {
    desired.len() == observed.len() && desired.iter().zip(observed).all(|(d, o)| d == o)
}

/// Accepts a JSON string or number as a string.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}
