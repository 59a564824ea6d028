//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
///
/// All of these abort the request. Malformed stream lines are not errors;
/// the decoder logs them and moves on.
#[derive(Error, Debug)]
pub enum LLMError {
    /// Required configuration is missing or unusable
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The API answered with a non-success status
    #[error("API request failed with HTTP {status}: {body}")]
    TransportError {
        /// HTTP status code
        status: u16,
        /// Raw response body text
        body: String,
    },

    /// The API answered with success but no readable body
    #[error("API response has an empty body")]
    EmptyBody,

    /// The byte stream failed after streaming started
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl LLMError {
    /// HTTP status code carried by a transport error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TransportError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
