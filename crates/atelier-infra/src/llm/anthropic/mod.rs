//! Anthropic Claude provider.
//!
//! [`AnthropicProvider`] implements the
//! [`LlmProvider`](atelier_core::llm::LlmProvider) trait against the
//! Anthropic Messages API.

pub mod client;
pub mod types;

pub use client::AnthropicProvider;
