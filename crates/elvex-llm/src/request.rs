//! Request construction for the elvex stream endpoint
//!
//! elvex takes a single flattened prompt rather than a structured message
//! list, so the conversation is rendered as `Human:`/`Assistant:` lines
//! below the system prompt.

use crate::{ElvexConfig, LLMError, Message, Result, Role};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// JSON body of a stream request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequestBody {
    /// Flattened prompt text
    pub prompt: String,
}

/// Render one message as a prompt line
///
/// A message without usable text renders as an empty line.
pub fn render_message(message: &Message) -> String {
    let Some(text) = message.text() else {
        debug!(role = ?message.role, "Message carries no text, rendering empty line");
        return String::new();
    };

    match message.role {
        Role::Assistant => format!("Assistant: {text}"),
        Role::User | Role::System | Role::Unknown => format!("Human: {text}"),
    }
}

/// Flatten a system prompt and conversation history into one prompt string
pub fn flatten_prompt(system_prompt: &str, messages: &[Message]) -> String {
    let history = messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{system_prompt}\n\n{history}")
}

/// Build the POST request for one conversation turn
///
/// Fails with [`LLMError::ConfigurationError`] before building anything if
/// the configuration is incomplete.
pub fn build_stream_request(
    config: &ElvexConfig,
    system_prompt: &str,
    messages: &[Message],
) -> Result<Request> {
    config.validate()?;

    let url = config.stream_url()?;
    let body = StreamRequestBody {
        prompt: flatten_prompt(system_prompt, messages),
    };

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|e| {
        LLMError::ConfigurationError(format!("API key is not a valid header value: {e}"))
    })?;
    auth.set_sensitive(true);

    let mut request = Request::new(Method::POST, url);
    let headers = request.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    headers.insert(AUTHORIZATION, auth);
    *request.body_mut() = Some(serde_json::to_vec(&body)?.into());

    Ok(request)
}
