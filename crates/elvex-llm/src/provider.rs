//! Streaming provider trait definition

use crate::{ApiStream, Message, ModelSpec, Result};

/// Trait for streaming LLM providers
///
/// Implementations turn one conversation turn into a lazy stream of
/// [`ApiStreamChunk`](crate::ApiStreamChunk)s.
pub trait StreamingProvider: Send + Sync {
    /// Start generating a reply to the conversation
    ///
    /// # Arguments
    ///
    /// * `system_prompt` - System prompt placed ahead of the history
    /// * `messages` - Conversation history in turn order
    ///
    /// # Returns
    ///
    /// A stream of chunks. Configuration problems fail here, before any I/O;
    /// HTTP failures surface as the first item of the stream.
    fn create_message(&self, system_prompt: &str, messages: &[Message]) -> Result<ApiStream>;

    /// Model identifier and capabilities for this provider instance
    fn get_model(&self) -> ModelSpec;

    /// Get the provider name (e.g., "elvex")
    fn name(&self) -> &str;
}
