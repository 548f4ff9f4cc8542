//! HTTP transport with bounded retries.
//!
//! [`HttpTransport`] is the raw I/O seam. [`RetryingTransport`] layers the
//! retry policy and status classification on top of any implementation.

pub mod retry;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::HeaderMap;

use crate::error::{AbacusError, Result};
use crate::provider::http::{build_client, shared_client};
use crate::provider::PreparedRequest;

pub use retry::RetryPolicy;

/// Incrementally delivered response body.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// The two physical delivery modes of a response body.
pub enum ResponseBody {
    Streaming(ByteStream),
    Buffered(Bytes),
}

impl ResponseBody {
    /// Drain the body into memory.
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self {
            Self::Buffered(bytes) => Ok(bytes),
            Self::Streaming(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    pub async fn into_text(self) -> Result<String> {
        let bytes = self.into_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streaming(_) => f.write_str("ResponseBody::Streaming(..)"),
            Self::Buffered(bytes) => write!(f, "ResponseBody::Buffered({} bytes)", bytes.len()),
        }
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn buffered(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: ResponseBody::Buffered(body.into()),
        }
    }

    pub fn streaming(status: u16, body: ByteStream) -> Self {
        Self {
            status,
            body: ResponseBody::Streaming(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw HTTP POST of a JSON body.
///
/// Implementations return every response, whatever its status; transport
/// level failures are `Err`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn send(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        (**self).send(endpoint, headers, body).await
    }
}

/// [`HttpTransport`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Transport over the process-wide shared client.
    pub fn shared() -> Result<Self> {
        Ok(Self::new(shared_client()?.clone()))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self::new(build_client(timeout)?))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let resp = self
            .client
            .post(endpoint)
            .headers(headers.clone())
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let streaming = body
            .get("stream")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        if streaming && resp.status().is_success() {
            let stream = resp
                .bytes_stream()
                .map(|chunk| chunk.map_err(AbacusError::from))
                .boxed();
            Ok(HttpResponse::streaming(status, stream))
        } else {
            Ok(HttpResponse::buffered(status, resp.bytes().await?))
        }
    }
}

/// Retries transient failures of an inner [`HttpTransport`].
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: HttpTransport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// POST `body`, retrying 5xx and transport failures per the policy.
    ///
    /// Any other non-2xx status is returned at once as [`AbacusError::Api`]
    /// carrying the response body.
    pub async fn execute(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let payload_bytes = serde_json::to_vec(body).map(|b| b.len()).unwrap_or(0);
        let inner = &self.inner;

        self.policy
            .execute(move |attempt| async move {
                tracing::debug!(endpoint, attempt, payload_bytes, "sending model request");
                let resp = inner.send(endpoint, headers, body).await?;
                if resp.is_success() {
                    return Ok(resp);
                }
                let status = resp.status;
                let message = match resp.body.into_text().await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!(endpoint, attempt, status, error = %e, "could not read error body");
                        String::new()
                    }
                };
                tracing::debug!(endpoint, attempt, status, "model request failed");
                Err(AbacusError::api(status, message))
            })
            .await
    }

    pub async fn execute_request(&self, request: &PreparedRequest) -> Result<HttpResponse> {
        self.execute(&request.endpoint, &request.headers, &request.body)
            .await
    }
}
