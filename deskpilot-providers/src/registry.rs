//! Provider registry keyed by provider tag.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use tracing::info;

use crate::anthropic::AnthropicProvider;
use crate::google::GoogleProvider;
use crate::model::Provider;
use crate::openai::OpenAIProvider;
use crate::proxy::ProxyProvider;
use crate::traits::LLMProvider;

/// Environment variable naming the OpenAI-compatible proxy endpoint.
pub const PROXY_URL_ENV: &str = "DESKPILOT_LLM_PROXY_URL";

/// Maps a provider tag to a generate-message capability.
#[derive(Default)]
pub struct ProviderRegistry {
    services: HashMap<Provider, Arc<dyn LLMProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Provider, service: Arc<dyn LLMProvider>) {
        self.services.insert(provider, service);
    }

    pub fn resolve(&self, provider: Provider) -> Option<Arc<dyn LLMProvider>> {
        self.services.get(&provider).cloned()
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.services.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Build a registry from the recognized environment variables. Backends
    /// whose credentials are absent are simply not registered.
    pub fn from_env() -> Self {
        let mut registry = Self::new();

        if let Ok(key) = env::var("ANTHROPIC_API_KEY") {
            registry.register(Provider::Anthropic, Arc::new(AnthropicProvider::new(key)));
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            registry.register(Provider::Openai, Arc::new(OpenAIProvider::new(key)));
        }
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            registry.register(Provider::Google, Arc::new(GoogleProvider::new(key)));
        }
        if let Ok(url) = env::var(PROXY_URL_ENV) {
            registry.register(Provider::Proxy, Arc::new(ProxyProvider::new(url)));
        }

        info!(
            "Provider registry initialized with {} backend(s)",
            registry.services.len()
        );
        registry
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::traits::ProviderError;
    use crate::types::{ChatMessage, GenerateResult, TokenUsage};
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct StubProvider;

    #[async_trait]
    impl LLMProvider for StubProvider {
        async fn generate_message(
            &self,
            _system_prompt: &str,
            _messages: &[ChatMessage],
            _model_name: &str,
            _tools_enabled: bool,
            _cancel: &CancellationToken,
        ) -> Result<GenerateResult, ProviderError> {
            Ok(GenerateResult {
                content_blocks: vec![],
                token_usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    #[test]
    fn test_resolve_registered_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(Provider::Openai, Arc::new(StubProvider));

        assert!(registry.resolve(Provider::Openai).is_some());
        assert!(registry.resolve(Provider::Anthropic).is_none());
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.providers().is_empty());
    }

    #[test]
    fn test_registration_overwrites() {
        let mut registry = ProviderRegistry::new();
        registry.register(Provider::Proxy, Arc::new(StubProvider));
        registry.register(Provider::Proxy, Arc::new(StubProvider));
        assert_eq!(registry.providers().len(), 1);
    }
}
