//! Environment variable secret provider.
//!
//! The config names the variable (`llm.api_key_env`, default
//! `ANTHROPIC_API_KEY`); this provider reads it and wraps the value in a
//! [`SecretString`] so it never reaches logs or `Debug` output.

use secrecy::SecretString;

/// Read-only secret lookup over environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretProvider;

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self
    }

    /// The variable's value, if set, valid Unicode, and non-blank.
    pub fn get(&self, name: &str) -> Option<SecretString> {
        Self::from_value(std::env::var(name).ok())
    }

    fn from_value(value: Option<String>) -> Option<SecretString> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(SecretString::from)
    }
}
