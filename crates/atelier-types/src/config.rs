//! Global configuration types for Atelier.
//!
//! `AtelierConfig` represents the top-level `config.toml` that controls the
//! HTTP server, the text-generation provider, and workflow limits.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderType;

/// Top-level configuration.
///
/// Loaded from `~/.atelier/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtelierConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the built web UI. Not served when absent.
    #[serde(default)]
    pub web_dir: Option<String>,
    /// When set, API requests must present this token.
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            web_dir: None,
            api_token: None,
        }
    }
}

/// Text-generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// When false every step uses its template.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub provider: ProviderType,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            provider: ProviderType::default(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Workflow runner limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Buffer size of each broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Upper bound for one agent step, generation included.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

fn default_event_capacity() -> usize {
    1024
}

fn default_step_timeout_secs() -> u64 {
    180
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}
