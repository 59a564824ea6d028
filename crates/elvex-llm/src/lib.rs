//! Streaming provider adapter for the elvex text-generation API
//!
//! This crate sends a chat-style prompt to an elvex app version and exposes the
//! response as a lazy stream of normalized chunks. It includes:
//!
//! - Message types for conversation history
//! - Prompt flattening and request construction
//! - An incremental newline-delimited JSON decoder
//! - Stream chunk and model info types
//! - A provider trait and the elvex implementation

pub mod decoder;
pub mod error;
pub mod messages;
pub mod model;
pub mod provider;
pub mod providers;
pub mod request;
pub mod stream;
pub mod transport;

// Re-export main types
pub use decoder::LineDecoder;
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, ImageSource, Message, MessageContent, Role};
pub use model::{ModelInfo, ModelSpec};
pub use provider::StreamingProvider;
pub use providers::{ElvexConfig, ElvexProvider};
pub use stream::{ApiStream, ApiStreamChunk};
pub use transport::{ByteStream, HttpTransport, ReqwestTransport, TransportResponse};
