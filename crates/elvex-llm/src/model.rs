//! Model identity and capability descriptors

use serde::{Deserialize, Serialize};

/// Capabilities, limits and pricing of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Maximum output tokens, `None` when the provider imposes no cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Context window in tokens
    pub context_window: u32,

    /// Whether image content is accepted
    pub supports_images: bool,

    /// Whether prompt caching is available
    pub supports_prompt_cache: bool,

    /// Input price in USD per million tokens
    pub input_price: f64,

    /// Output price in USD per million tokens
    pub output_price: f64,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ModelInfo {
    /// Fixed defaults for elvex app versions
    ///
    /// elvex does not publish per-app limits or pricing.
    pub fn elvex_defaults() -> Self {
        Self {
            max_tokens: None,
            context_window: 128_000,
            supports_images: true,
            supports_prompt_cache: false,
            input_price: 0.0,
            output_price: 0.0,
            description: None,
        }
    }
}

/// Model identifier paired with its info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model identifier
    pub id: String,
    /// Model capabilities
    pub info: ModelInfo,
}
