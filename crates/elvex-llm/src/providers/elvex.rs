//! elvex provider implementation
//!
//! This module implements the StreamingProvider trait for elvex app versions.
//! Each turn is sent as one flattened prompt to
//! `POST {api_base}/apps/{app_id}/versions/{version}/text/stream`, and the
//! newline-delimited JSON reply is decoded into text chunks as it arrives.
//!
//! # Example
//!
//! ```no_run
//! use elvex_llm::{ElvexProvider, Message, StreamingProvider};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ELVEX_APP_ID, ELVEX_VERSION and ELVEX_API_KEY
//!     let provider = ElvexProvider::from_env()?;
//!
//!     let mut stream = provider.create_message("You are helpful.", &[Message::user("Hello!")])?;
//!     while let Some(chunk) = stream.next().await {
//!         if let Some(text) = chunk?.as_text() {
//!             print!("{text}");
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

use crate::request::build_stream_request;
use crate::transport::{ByteStream, HttpTransport, ReqwestTransport, TransportResponse};
use crate::{
    ApiStream, ApiStreamChunk, LLMError, LineDecoder, Message, ModelInfo, ModelSpec, Result,
    StreamingProvider,
};
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use reqwest::{Request, Url};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DEFAULT_ELVEX_API_BASE: &str = "https://api.elvex.ai/v0";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the elvex provider
#[derive(Clone)]
pub struct ElvexConfig {
    /// elvex app identifier
    pub app_id: String,

    /// App version identifier
    pub version: String,

    /// API key sent as a bearer token
    pub api_key: String,

    /// Base URL for the elvex API (default: "https://api.elvex.ai/v0")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl ElvexConfig {
    /// Create a new config with default settings
    pub fn new(
        app_id: impl Into<String>,
        version: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            version: version.into(),
            api_key: api_key.into(),
            api_base: DEFAULT_ELVEX_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create config from environment variables
    ///
    /// Reads `ELVEX_APP_ID`, `ELVEX_VERSION` and `ELVEX_API_KEY`.
    /// Optionally reads the base URL from `ELVEX_API_BASE` if set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |name: &str| {
            lookup(name).ok_or_else(|| {
                LLMError::ConfigurationError(format!("{name} environment variable not set"))
            })
        };

        let mut config = Self::new(
            require("ELVEX_APP_ID")?,
            require("ELVEX_VERSION")?,
            require("ELVEX_API_KEY")?,
        );
        if let Some(api_base) = lookup("ELVEX_API_BASE") {
            config.api_base = api_base;
        }
        Ok(config)
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Check that app ID, version and API key are all present
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("API key", &self.api_key),
            ("app ID", &self.app_id),
            ("version", &self.version),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LLMError::ConfigurationError(format!(
                "elvex API key, app ID, and version are required (missing: {})",
                missing.join(", ")
            )))
        }
    }

    /// URL of the text stream endpoint for this app version
    pub fn stream_url(&self) -> Result<Url> {
        let invalid =
            |reason: String| LLMError::ConfigurationError(format!("invalid elvex API base: {reason}"));

        let mut url = Url::parse(&self.api_base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid(self.api_base.clone()))?
            .pop_if_empty()
            .extend([
                "apps",
                self.app_id.as_str(),
                "versions",
                self.version.as_str(),
                "text",
                "stream",
            ]);
        Ok(url)
    }

    /// Model identifier, `{app_id}@{version}`
    pub fn model_id(&self) -> String {
        format!("{}@{}", self.app_id, self.version)
    }
}

impl Default for ElvexConfig {
    fn default() -> Self {
        Self::new(String::new(), String::new(), String::new())
    }
}

impl fmt::Debug for ElvexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElvexConfig")
            .field("app_id", &self.app_id)
            .field("version", &self.version)
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// elvex provider
///
/// Holds configuration and a transport; every call to
/// [`create_message`](StreamingProvider::create_message) builds a fresh
/// request and decoder, so one provider can serve independent streams.
pub struct ElvexProvider {
    config: ElvexConfig,
    transport: Arc<dyn HttpTransport>,
}

impl ElvexProvider {
    /// Create a new elvex provider with custom configuration
    pub fn with_config(config: ElvexConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a provider that sends requests through the given transport
    pub fn with_transport(config: ElvexConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    /// Create a new elvex provider with default settings
    pub fn new(
        app_id: impl Into<String>,
        version: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(ElvexConfig::new(app_id, version, api_key))
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(ElvexConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &ElvexConfig {
        &self.config
    }
}

impl StreamingProvider for ElvexProvider {
    #[instrument(
        skip(self, system_prompt, messages),
        fields(app_id = %self.config.app_id, version = %self.config.version, messages = messages.len())
    )]
    fn create_message(&self, system_prompt: &str, messages: &[Message]) -> Result<ApiStream> {
        let request = build_stream_request(&self.config, system_prompt, messages)?;
        debug!(url = %request.url(), "Built elvex stream request");

        Ok(Box::pin(stream_response(Arc::clone(&self.transport), request)))
    }

    fn get_model(&self) -> ModelSpec {
        ModelSpec {
            id: self.config.model_id(),
            info: ModelInfo::elvex_defaults(),
        }
    }

    fn name(&self) -> &'static str {
        "elvex"
    }
}

/// Send the request and hand back the body once the status checks out
async fn open_body(transport: &dyn HttpTransport, request: Request) -> Result<ByteStream> {
    let response = transport.send(request).await?;
    let status = response.status;

    if !status.is_success() {
        let body = response.text().await;
        warn!(status = %status, "elvex API returned an error status");
        return Err(LLMError::TransportError {
            status: status.as_u16(),
            body,
        });
    }

    let TransportResponse { body, .. } = response;
    body.ok_or(LLMError::EmptyBody)
}

/// Drive one response from request to drained stream
///
/// Nothing is sent until the stream is first polled. The body and decoder
/// live inside the stream, so dropping it releases the connection.
fn stream_response(
    transport: Arc<dyn HttpTransport>,
    request: Request,
) -> impl Stream<Item = Result<ApiStreamChunk>> + Send {
    try_stream! {
        let mut body = open_body(transport.as_ref(), request).await?;
        let mut decoder = LineDecoder::new();
        let mut fragments = 0usize;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for text in decoder.push(&chunk) {
                fragments += 1;
                yield ApiStreamChunk::Text { text };
            }
        }

        let malformed = decoder.malformed_lines();
        for text in decoder.finish() {
            fragments += 1;
            yield ApiStreamChunk::Text { text };
        }

        info!(fragments, malformed, "elvex stream drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockHttpTransport;
    use bytes::Bytes;
    use futures::TryStreamExt;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use tokio_test::assert_ok;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn body_from(chunks: &[&'static str]) -> ByteStream {
        let items: Vec<Result<Bytes>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        Box::pin(futures::stream::iter(items))
    }

    fn mock_provider(transport: MockHttpTransport) -> ElvexProvider {
        ElvexProvider::with_transport(ElvexConfig::new("app1", "v2", "key"), Arc::new(transport))
    }

    async fn collect_text(stream: ApiStream) -> Result<Vec<String>> {
        let chunks: Vec<ApiStreamChunk> = stream.try_collect().await?;
        Ok(chunks
            .into_iter()
            .filter_map(|c| c.as_text().map(str::to_string))
            .collect())
    }

    #[test]
    fn test_provider_creation() {
        let provider = assert_ok!(ElvexProvider::new("app1", "v2", "key"));
        assert_eq!(provider.name(), "elvex");
    }

    #[test]
    fn test_get_model() {
        let provider = ElvexProvider::new("app1", "v2", "key").unwrap();
        let model = provider.get_model();
        assert_eq!(model.id, "app1@v2");
        assert_eq!(model.info, ModelInfo::elvex_defaults());
    }

    #[test]
    fn test_config_builder() {
        let config = ElvexConfig::new("a", "b", "c")
            .with_api_base("http://localhost:9000/v0")
            .with_timeout(30);
        assert_eq!(config.api_base, "http://localhost:9000/v0");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("ELVEX_APP_ID", "app1"),
            ("ELVEX_VERSION", "v2"),
            ("ELVEX_API_KEY", "key"),
            ("ELVEX_API_BASE", "http://localhost:1234"),
        ]
        .into_iter()
        .collect();

        let config = ElvexConfig::from_lookup(|name| vars.get(name).map(ToString::to_string)).unwrap();
        assert_eq!(config.model_id(), "app1@v2");
        assert_eq!(config.api_base, "http://localhost:1234");
    }

    #[test]
    fn test_config_from_lookup_missing_key() {
        let result = ElvexConfig::from_lookup(|name| {
            (name != "ELVEX_API_KEY").then(|| "x".to_string())
        });
        match result {
            Err(LLMError::ConfigurationError(msg)) => assert!(msg.contains("ELVEX_API_KEY")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_names_missing_fields() {
        let err = ElvexConfig::new("app1", " ", "").validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.ends_with("(missing: API key, version)"));
    }

    #[test]
    fn test_stream_url_with_trailing_slash() {
        let config = ElvexConfig::new("my app", "v2", "key").with_api_base("http://localhost:8080/v0/");
        assert_eq!(
            config.stream_url().unwrap().as_str(),
            "http://localhost:8080/v0/apps/my%20app/versions/v2/text/stream"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let debug = format!("{:?}", ElvexConfig::new("app1", "v2", "super-secret"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_missing_config_makes_no_request() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().times(0);

        let provider =
            ElvexProvider::with_transport(ElvexConfig::new("app1", "", "key"), Arc::new(transport));
        let result = provider.create_message("sys", &[Message::user("hi")]);
        assert!(matches!(result, Err(LLMError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_stream_decodes_split_lines() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .withf(|request: &Request| {
                request.url().path() == "/v0/apps/app1/versions/v2/text/stream"
                    && request.headers()["authorization"] == "Bearer key"
            })
            .times(1)
            .returning(|_| {
                Ok(TransportResponse::new(
                    StatusCode::OK,
                    Some(body_from(&[r#"{"delta":"Hel"#, "lo\"}\n{\"delta\":\" world\"}\n"])),
                ))
            });

        let stream = mock_provider(transport)
            .create_message("sys", &[Message::user("hi")])
            .unwrap();
        assert_eq!(collect_text(stream).await.unwrap(), vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_malformed_and_unterminated_lines() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().returning(|_| {
            Ok(TransportResponse::new(
                StatusCode::OK,
                Some(body_from(&["{\"delta\":\"a\"}\n{oops\n", "{\"delta\":\"b\"}"])),
            ))
        });

        let stream = mock_provider(transport).create_message("sys", &[]).unwrap();
        assert_eq!(collect_text(stream).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_error_status_surfaces_on_first_poll() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().returning(|_| {
            Ok(TransportResponse::new(
                StatusCode::TOO_MANY_REQUESTS,
                Some(body_from(&["rate limited"])),
            ))
        });

        let mut stream = mock_provider(transport).create_message("sys", &[]).unwrap();
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.status(), Some(429));
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("rate limited"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_error_status_kept_when_body_read_fails() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().returning(|_| {
            let chunks: Vec<Result<Bytes>> = vec![
                Ok(Bytes::from_static(b"internal")),
                Err(LLMError::StreamError("connection reset".to_string())),
            ];
            let body: ByteStream = Box::pin(futures::stream::iter(chunks));
            Ok(TransportResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(body),
            ))
        });

        let mut stream = mock_provider(transport).create_message("sys", &[]).unwrap();
        let err = stream.next().await.unwrap().unwrap_err();
        match err {
            LLMError::TransportError { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal");
            }
            other => panic!("expected TransportError, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_success_without_body() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .returning(|_| Ok(TransportResponse::new(StatusCode::OK, None)));

        let mut stream = mock_provider(transport).create_message("sys", &[]).unwrap();
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, LLMError::EmptyBody));
    }

    #[tokio::test]
    async fn test_body_error_ends_stream() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().returning(|_| {
            let items: Vec<Result<Bytes>> = vec![
                Ok(Bytes::from_static(b"{\"delta\":\"partial\"}\n")),
                Err(LLMError::StreamError("connection reset".to_string())),
                Ok(Bytes::from_static(b"{\"delta\":\"never\"}\n")),
            ];
            let body: ByteStream = Box::pin(futures::stream::iter(items));
            Ok(TransportResponse::new(StatusCode::OK, Some(body)))
        });

        let mut stream = mock_provider(transport).create_message("sys", &[]).unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.as_text(), Some("partial"));
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(LLMError::StreamError(_))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/apps/app1/versions/v2/text/stream"))
            .and(header("authorization", "Bearer key"))
            .and(header("accept", "text/event-stream"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "prompt": "Be nice.\n\nHuman: Hi\nAssistant: Hello\nHuman: Bye"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("{\"delta\":\"See\"}\n\n{\"delta\":\" you\"}\n{\"done\":true}"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = ElvexConfig::new("app1", "v2", "key").with_api_base(format!("{}/v0", server.uri()));
        let provider = ElvexProvider::with_config(config).unwrap();
        let messages = vec![
            Message::user("Hi"),
            Message::assistant("Hello"),
            Message::user("Bye"),
        ];

        let stream = provider.create_message("Be nice.", &messages).unwrap();
        assert_eq!(collect_text(stream).await.unwrap(), vec!["See", " you"]);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let config = ElvexConfig::new("app1", "v2", "key").with_api_base(server.uri());
        let provider = ElvexProvider::with_config(config).unwrap();

        let mut stream = provider.create_message("sys", &[]).unwrap();
        match stream.next().await {
            Some(Err(LLMError::TransportError { status, body })) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_request_until_polled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"delta\":\"x\"}\n"))
            .expect(0)
            .mount(&server)
            .await;

        let config = ElvexConfig::new("app1", "v2", "key").with_api_base(server.uri());
        let provider = ElvexProvider::with_config(config).unwrap();

        let stream = provider.create_message("sys", &[]).unwrap();
        drop(stream);
    }

    #[tokio::test]
    async fn test_early_drop_releases_stream() {
        let server = MockServer::start().await;
        let body: String = (0..100).map(|i| format!("{{\"delta\":\"{i} \"}}\n")).collect();
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let config = ElvexConfig::new("app1", "v2", "key").with_api_base(server.uri());
        let provider = ElvexProvider::with_config(config).unwrap();

        let mut stream = provider.create_message("sys", &[]).unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.as_text(), Some("0 "));
        drop(stream);

        // The provider stays usable for a fresh, independent stream.
        let stream = provider.create_message("sys", &[]).unwrap();
        assert_eq!(collect_text(stream).await.unwrap().len(), 100);
    }
}
