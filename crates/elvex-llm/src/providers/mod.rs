//! Concrete LLM provider implementations
//!
//! This module contains implementations of the StreamingProvider trait for
//! the supported services.

pub mod elvex;

pub use elvex::{ElvexConfig, ElvexProvider};
