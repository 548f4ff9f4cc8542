//! Shared HTTP client and auth header helpers.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::error::AbacusError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Default per-request timeout of the shared client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build a client with the given request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, AbacusError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| AbacusError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> Result<&'static reqwest::Client, AbacusError> {
    if let Some(client) = SHARED_CLIENT.get() {
        return Ok(client);
    }
    let client = build_client(DEFAULT_REQUEST_TIMEOUT)?;
    Ok(SHARED_CLIENT.get_or_init(|| client))
}

fn json_headers(stream: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let accept = if stream {
        "text/event-stream"
    } else {
        "application/json"
    };
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers
}

fn header_value(value: &str) -> Result<HeaderValue, AbacusError> {
    HeaderValue::from_str(value)
        .map_err(|_| AbacusError::Configuration("API key contains invalid characters".into()))
}

/// Headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str, stream: bool) -> Result<HeaderMap, AbacusError> {
    let mut headers = json_headers(stream);
    headers.insert(AUTHORIZATION, header_value(&format!("Bearer {api_key}"))?);
    Ok(headers)
}

/// Headers for Azure-style `api-key` authentication.
pub fn api_key_headers(api_key: &str, stream: bool) -> Result<HeaderMap, AbacusError> {
    let mut headers = json_headers(stream);
    headers.insert(HeaderName::from_static("api-key"), header_value(api_key)?);
    Ok(headers)
}
