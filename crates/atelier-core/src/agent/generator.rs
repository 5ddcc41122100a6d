//! Primary-document generation with template fallback.
//!
//! The generator asks the configured provider for an agent's primary
//! document. When no provider is configured, the call fails, times out, or
//! returns nothing, the agent's template is used instead and the reason is
//! reported so the runner can log it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use atelier_types::agent::ContentSource;

use crate::llm::BoxLlmProvider;

use super::context::AgentContext;
use super::script::AgentScript;

/// Request settings applied on top of what a script builds.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    /// Upper bound for a single provider call.
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 4096,
            temperature: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Result of generating a primary document.
#[derive(Debug, Clone)]
pub struct Generation {
    pub content: String,
    pub source: ContentSource,
    /// Why the template was used, when it was.
    pub fallback_reason: Option<String>,
}

/// Produces primary documents, preferring the provider when one is set.
#[derive(Debug, Clone)]
pub struct Generator {
    provider: Option<Arc<BoxLlmProvider>>,
    settings: GenerationSettings,
}

impl Generator {
    /// Generator that always uses templates.
    pub fn template_only() -> Self {
        Self {
            provider: None,
            settings: GenerationSettings::default(),
        }
    }

    pub fn new(provider: BoxLlmProvider, settings: GenerationSettings) -> Self {
        Self {
            provider: Some(Arc::new(provider)),
            settings,
        }
    }

    /// Name of the configured provider, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(BoxLlmProvider::name)
    }

    pub async fn generate(&self, script: &dyn AgentScript, ctx: &AgentContext) -> Generation {
        let role = script.role();
        let Some(provider) = self.provider.as_deref() else {
            return Self::fallback(script, ctx, "no text-generation provider configured");
        };

        let mut request = script.build_request(ctx);
        if request.model.is_empty() {
            request.model = self.settings.model.clone();
        }
        request.max_tokens = self
            .settings
            .max_tokens
            .min(provider.capabilities().max_output_tokens.max(1));
        if request.temperature.is_none() {
            request.temperature = self.settings.temperature;
        }

        let started = Instant::now();
        let result = tokio::time::timeout(self.settings.timeout, provider.complete(&request)).await;

        match result {
            Ok(Ok(response)) if !response.content.trim().is_empty() => {
                tracing::info!(
                    agent = %role,
                    provider = provider.name(),
                    model = %response.model,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "generated primary document"
                );
                Generation {
                    content: response.content,
                    source: ContentSource::Llm,
                    fallback_reason: None,
                }
            }
            Ok(Ok(_)) => Self::fallback(script, ctx, "provider returned an empty response"),
            Ok(Err(e)) => {
                tracing::warn!(agent = %role, provider = provider.name(), error = %e, "generation failed, using template");
                Self::fallback(script, ctx, &e.to_string())
            }
            Err(_) => {
                let secs = self.settings.timeout.as_secs();
                tracing::warn!(agent = %role, provider = provider.name(), timeout_secs = secs, "generation timed out, using template");
                Self::fallback(script, ctx, &format!("provider timed out after {secs}s"))
            }
        }
    }

    fn fallback(script: &dyn AgentScript, ctx: &AgentContext, reason: &str) -> Generation {
        Generation {
            content: script.fallback(ctx),
            source: ContentSource::Template,
            fallback_reason: Some(reason.to_string()),
        }
    }
}
