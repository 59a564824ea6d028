//! HTTP transport seam
//!
//! Providers hand a fully built [`reqwest::Request`] to an [`HttpTransport`]
//! and get back the status plus an incremental body. The default
//! implementation wraps a [`reqwest::Client`].

use crate::{LLMError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Incremental response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Status and body of an HTTP response
pub struct TransportResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response body, `None` when the server sent none
    pub body: Option<ByteStream>,
}

impl TransportResponse {
    /// Create a response from a status and a body stream
    pub fn new(status: StatusCode, body: Option<ByteStream>) -> Self {
        Self { status, body }
    }

    /// Read the body as text (lossy UTF-8)
    ///
    /// A read error stops collection and returns what arrived before it.
    pub async fn text(self) -> String {
        let Some(mut body) = self.body else {
            return String::new();
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(e) => {
                    warn!(error = %e, "Response body cut short");
                    break;
                }
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Sends HTTP requests on behalf of a provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute the request and return once response headers are available
    async fn send(&self, request: reqwest::Request) -> Result<TransportResponse>;
}

/// [`HttpTransport`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(url = %request.url()))]
    async fn send(&self, request: reqwest::Request) -> Result<TransportResponse> {
        let response = self.client.execute(request).await?;
        let status = response.status();
        debug!(status = %status, content_length = ?response.content_length(), "Response headers received");

        if response.content_length() == Some(0) {
            return Ok(TransportResponse::new(status, None));
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| LLMError::StreamError(format!("failed to read response body: {e}")))
        });
        Ok(TransportResponse::new(status, Some(Box::pin(body))))
    }
}
