//! LLM provider implementations.
//!
//! Contains concrete implementations of the [`LlmProvider`] trait defined in
//! `atelier-core`, a factory ([`create_provider`]) that picks one from the
//! `[llm]` config section, and [`build_generator`], which wires the result
//! into the agents' [`Generator`].
//!
//! [`LlmProvider`]: atelier_core::llm::LlmProvider

pub mod anthropic;
pub mod openai_compat;

use std::time::Duration;

use secrecy::SecretString;

use atelier_core::agent::{GenerationSettings, Generator};
use atelier_core::llm::BoxLlmProvider;
use atelier_types::config::LlmConfig;
use atelier_types::llm::{LlmError, ProviderType};

use crate::secret::EnvSecretProvider;

use self::anthropic::AnthropicProvider;
use self::openai_compat::OpenAiCompatibleProvider;

/// Create a [`BoxLlmProvider`] from the `[llm]` config section.
///
/// # Errors
///
/// Anthropic always needs a key. OpenAI-compatible endpoints need one unless
/// a custom `base_url` is set (local servers ignore it).
pub fn create_provider(
    config: &LlmConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    match config.provider {
        ProviderType::Anthropic => {
            let key = api_key.ok_or(LlmError::AuthenticationFailed)?;
            let mut provider = AnthropicProvider::new(
                key,
                config.model.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            if let Some(base_url) = config.base_url.as_deref() {
                provider = provider.with_base_url(base_url);
            }
            Ok(BoxLlmProvider::new(provider))
        }
        ProviderType::OpenAiCompatible => {
            let key = match (api_key, config.base_url.as_deref()) {
                (Some(key), _) => key,
                (None, Some(_)) => SecretString::from("unused"),
                (None, None) => return Err(LlmError::AuthenticationFailed),
            };
            let oai_config =
                openai_compat::config::for_endpoint(config.base_url.as_deref(), key, &config.model);
            Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config)))
        }
    }
}

/// Build the generator the agents use.
///
/// Falls back to a template-only generator (and says why) when generation is
/// disabled, the key is missing, or the provider cannot be constructed.
pub fn build_generator(config: &LlmConfig) -> Generator {
    if !config.enabled {
        tracing::info!("text generation disabled; agents will use built-in templates");
        return Generator::template_only();
    }

    let api_key = EnvSecretProvider::new().get(&config.api_key_env);
    match create_provider(config, api_key) {
        Ok(provider) => {
            tracing::info!(
                provider = provider.name(),
                model = %config.model,
                "text generation provider configured"
            );
            Generator::new(provider, settings(config))
        }
        Err(LlmError::AuthenticationFailed) => {
            tracing::warn!(
                env = %config.api_key_env,
                "no API key found; agents will use built-in templates"
            );
            Generator::template_only()
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not create provider; agents will use built-in templates");
            Generator::template_only()
        }
    }
}

fn settings(config: &LlmConfig) -> GenerationSettings {
    GenerationSettings {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        timeout: Duration::from_secs(config.timeout_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: ProviderType, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            base_url: base_url.map(str::to_string),
            api_key_env: "ATELIER_TEST_UNSET_KEY".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_anthropic_requires_key() {
        let err = create_provider(&config(ProviderType::Anthropic, None), None).err();
        assert!(matches!(err, Some(LlmError::AuthenticationFailed)));

        let provider = create_provider(
            &config(ProviderType::Anthropic, None),
            Some(SecretString::from("sk-ant-test")),
        )
        .unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn test_local_openai_compatible_needs_no_key() {
        let provider = create_provider(
            &config(ProviderType::OpenAiCompatible, Some("http://localhost:11434/v1")),
            None,
        )
        .unwrap();
        assert_eq!(provider.name(), "ollama");

        let err = create_provider(&config(ProviderType::OpenAiCompatible, None), None).err();
        assert!(matches!(err, Some(LlmError::AuthenticationFailed)));
    }

    #[test]
    fn test_build_generator_without_key_is_template_only() {
        let generator = build_generator(&config(ProviderType::Anthropic, None));
        assert!(generator.provider_name().is_none());

        let disabled = LlmConfig {
            enabled: false,
            ..config(ProviderType::OpenAiCompatible, Some("http://localhost:11434/v1"))
        };
        assert!(build_generator(&disabled).provider_name().is_none());
    }

    #[test]
    fn test_build_generator_with_local_endpoint() {
        let generator =
            build_generator(&config(ProviderType::OpenAiCompatible, Some("http://localhost:11434/v1")));
        assert_eq!(generator.provider_name(), Some("ollama"));
    }

    #[test]
    fn test_settings_follow_config() {
        let mut cfg = config(ProviderType::Anthropic, None);
        cfg.max_tokens = 2000;
        cfg.temperature = Some(0.1);
        cfg.timeout_secs = 45;
        let s = settings(&cfg);
        assert_eq!(s.max_tokens, 2000);
        assert_eq!(s.temperature, Some(0.1));
        assert_eq!(s.timeout, Duration::from_secs(45));
    }
}
