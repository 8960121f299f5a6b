//! HTTP transport for the Mailgun API (reqwest-based).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::{ClientConfig, API_USER};
use crate::error::{TransportError, TransportResult};
use crate::request::{ApiRequest, Method};
use crate::retry::RetryPolicy;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Executes remote API calls.
///
/// Implementations classify every failure into [`TransportError`], retry
/// transient ones internally, and honour `cancel` on every attempt.
/// Implementations must be safe to share between concurrent passes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a request and returns the decoded JSON payload
    /// (`Value::Null` for empty bodies).
    async fn execute(&self, request: ApiRequest, cancel: &CancellationToken)
        -> TransportResult<Value>;
}

/// Mailgun transport over a pooled `reqwest::Client`.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl HttpTransport {
    /// Creates a transport with its own connection pool.
    pub fn new(config: ClientConfig) -> TransportResult<Self> {
        let http = Self::build_http_client()?;
        Self::with_http_client(config, http)
    }

    /// Creates a transport on top of an existing (shared) client.
    pub fn with_http_client(config: ClientConfig, http: Client) -> TransportResult<Self> {
        let base_url = Url::parse(config.effective_base_url()).map_err(|e| {
            TransportError::Validation {
                field: Some("base_url".to_string()),
                reason: format!("'{}': {e}", config.effective_base_url()),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Validation {
                field: Some("base_url".to_string()),
                reason: format!("'{base_url}' cannot be used as a base URL"),
            });
        }

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
            timeout: config.timeout,
            retry: config.retry,
        })
    }

    /// Builds the pooled HTTP client shared by all transports of a process.
    pub fn build_http_client() -> TransportResult<Client> {
        Client::builder()
            .user_agent(concat!("provider-mailgun/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TransportError::from)
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Returns the retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn url_for(&self, request: &ApiRequest) -> TransportResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::unknown(None, "base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(&request.segments);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> TransportResult<Value> {
        let mut builder = self
            .http
            .request(method.into(), url)
            .basic_auth(API_USER, Some(&self.api_key))
            .timeout(self.timeout)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| TransportError::Unknown {
                status: Some(status.as_u16()),
                message: format!("invalid JSON in response body: {e}"),
                source: Some(Box::new(e)),
            });
        }

        let retry_after =
            parse_retry_after(response.headers()).unwrap_or(self.retry.rate_limit_fallback);
        let text = response.text().await.unwrap_or_default();
        Err(TransportError::from_status(
            status.as_u16(),
            error_message(status, &text),
            retry_after,
        ))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request, cancel), fields(method = %request.method, path = %request.path()))]
    async fn execute(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> TransportResult<Value> {
        let url = self.url_for(&request)?;
        // Encoded exactly once; every attempt sends its own copy of the full
        // buffer, never a stream drained by an earlier attempt.
        let body = match request.method {
            Method::Post | Method::Put => Some(request.form.encode()),
            Method::Get | Method::Delete => None,
        };
        let method = request.method;
        let operation = request.to_string();

        self.retry
            .execute(&operation, cancel, |attempt| {
                let url = url.clone();
                let body = body.clone();
                async move {
                    debug!(attempt = attempt + 1, "Sending request");
                    self.send_once(method, url, body).await
                }
            })
            .await
    }
}

/// Parses a `Retry-After` header given in seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Extracts Mailgun's `{"message": ...}` from an error body, falling back to
/// the raw text or the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Region;
    use reqwest::header::HeaderValue;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(ClientConfig::new("key", Region::Us).with_base_url(base)).unwrap()
    }

    #[test]
    fn test_url_encodes_segments() {
        let t = transport("http://localhost:1234");
        let req = ApiRequest::get(["v3", "lists", "dev@example.com"]);
        assert_eq!(
            t.url_for(&req).unwrap().as_str(),
            "http://localhost:1234/v3/lists/dev@example.com"
        );

        let req = ApiRequest::get(["v3", "example.com", "bounces", "a b/c"]);
        assert_eq!(
            t.url_for(&req).unwrap().as_str(),
            "http://localhost:1234/v3/example.com/bounces/a%20b%2Fc"
        );
    }

    #[test]
    fn test_url_keeps_base_prefix_and_query() {
        let t = transport("http://localhost:1234/proxy/");
        let req = ApiRequest::get(["v3", "example.com", "templates", "welcome"])
            .with_query("active", "yes");
        assert_eq!(
            t.url_for(&req).unwrap().as_str(),
            "http://localhost:1234/proxy/v3/example.com/templates/welcome?active=yes"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpTransport::new(
            ClientConfig::new("key", Region::Us).with_base_url("not a url"),
        );
        assert!(matches!(
            result,
            Err(TransportError::Validation { field: Some(ref f), .. }) if f == "base_url"
        ));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"message":"'address' parameter is missing"}"#),
            "'address' parameter is missing"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream"), "upstream");
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }
}
