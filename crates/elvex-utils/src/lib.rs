//! Shared utilities for elvex-rs
//!
//! This crate provides common functionality used across the elvex-rs workspace,
//! including logging setup and runtime configuration.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, LogFormat};
pub use logging::{init_tracing, init_tracing_with};
