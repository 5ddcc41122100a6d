//! Type-erased [`LlmProvider`] so the backend can be picked from config at
//! runtime. `LlmProvider::complete` returns `impl Future`, which rules out
//! `dyn LlmProvider`; the erased trait below boxes that future instead.

use std::future::Future;
use std::pin::Pin;

use atelier_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};

use super::provider::LlmProvider;

type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

trait ErasedProvider: Send + Sync {
    fn erased_name(&self) -> &str;
    fn erased_capabilities(&self) -> &ProviderCapabilities;
    fn erased_complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
}

impl<T: LlmProvider> ErasedProvider for T {
    fn erased_name(&self) -> &str {
        self.name()
    }

    fn erased_capabilities(&self) -> &ProviderCapabilities {
        self.capabilities()
    }

    fn erased_complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(self.complete(request))
    }
}

/// A provider chosen at runtime (Anthropic, OpenAI-compatible, or a test fake).
pub struct BoxLlmProvider(Box<dyn ErasedProvider>);

impl BoxLlmProvider {
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self(Box::new(provider))
    }

    pub fn name(&self) -> &str {
        self.0.erased_name()
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        self.0.erased_capabilities()
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.0.erased_complete(request).await
    }
}

impl std::fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxLlmProvider").field(&self.name()).finish()
    }
}
