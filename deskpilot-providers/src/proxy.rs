//! Proxy provider for OpenAI-compatible gateways.
//!
//! Models that resolve to no first-party backend route through a deployment's
//! LLM proxy, which speaks the chat-completions dialect.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::openai::OpenAIProvider;
use crate::traits::{LLMProvider, ProviderError};
use crate::types::{ChatMessage, GenerateResult};

pub struct ProxyProvider {
    inner: OpenAIProvider,
}

impl ProxyProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            inner: OpenAIProvider::with_base_url(base_url, None),
        }
    }

    pub fn with_api_key(base_url: String, api_key: String) -> Self {
        Self {
            inner: OpenAIProvider::with_base_url(base_url, Some(api_key)),
        }
    }
}

#[async_trait]
impl LLMProvider for ProxyProvider {
    async fn generate_message(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        model_name: &str,
        tools_enabled: bool,
        cancel: &CancellationToken,
    ) -> Result<GenerateResult, ProviderError> {
        self.inner
            .generate_message(system_prompt, messages, model_name, tools_enabled, cancel)
            .await
    }

    fn name(&self) -> &str {
        "proxy"
    }
}
