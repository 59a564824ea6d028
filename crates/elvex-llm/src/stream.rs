//! Normalized stream output

use crate::Result;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Lazy, single-pass stream of chunks produced by a provider
pub type ApiStream = Pin<Box<dyn Stream<Item = Result<ApiStreamChunk>> + Send>>;

/// One unit of provider output
///
/// The host output channel knows several tags; the elvex provider only
/// ever emits [`ApiStreamChunk::Text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiStreamChunk {
    /// Newly generated text
    Text {
        /// Text delta
        text: String,
    },

    /// Newly generated reasoning text
    Reasoning {
        /// Reasoning delta
        reasoning: String,
    },

    /// Token usage report
    Usage {
        /// Number of input tokens
        input_tokens: usize,
        /// Number of output tokens
        output_tokens: usize,
    },
}

impl ApiStreamChunk {
    /// Create a text chunk
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text carried by a text chunk
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}
