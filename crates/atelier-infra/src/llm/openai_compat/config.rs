//! Configuration for OpenAI-compatible providers.
//!
//! Any endpoint speaking the chat completions protocol works: OpenAI itself,
//! hosted compatibility layers (Gemini, Mistral), and local servers such as
//! Ollama or vLLM. Known hosts get their published limits; anything else
//! gets conservative defaults.

use secrecy::SecretString;

use atelier_types::llm::ProviderCapabilities;

/// Base URL used when none is configured.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for an OpenAI-compatible provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai", "ollama").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    /// API key for authentication. Local servers accept any value.
    pub api_key: SecretString,
    /// Model identifier (e.g., "gpt-4o", "llama3.1").
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// Configuration for `base_url` (or OpenAI when `None`).
pub fn for_endpoint(base_url: Option<&str>, api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    let base_url = base_url
        .map(|u| u.trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
    let (provider_name, capabilities) = known_host(&base_url);

    OpenAiCompatConfig {
        provider_name: provider_name.to_string(),
        base_url,
        api_key,
        model: model.to_string(),
        capabilities,
    }
}

/// Provider name and limits inferred from the endpoint host.
fn known_host(base_url: &str) -> (&'static str, ProviderCapabilities) {
    let caps = |max_context_tokens, max_output_tokens| ProviderCapabilities {
        max_context_tokens,
        max_output_tokens,
    };

    if base_url.contains("api.openai.com") {
        ("openai", caps(128_000, 16_384))
    } else if base_url.contains("generativelanguage.googleapis.com") {
        ("gemini", caps(1_000_000, 65_536))
    } else if base_url.contains("api.mistral.ai") {
        ("mistral", caps(128_000, 32_768))
    } else if base_url.contains(":11434") {
        ("ollama", caps(32_000, 8_192))
    } else {
        ("openai_compatible", caps(32_000, 4_096))
    }
}
