//! Anthropic messages-API client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::tools::anthropic_tools;
use crate::traits::{LLMProvider, ProviderError};
use crate::types::{ChatMessage, ContentBlock, GenerateResult, TokenUsage};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, ANTHROPIC_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn request(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        model_name: &str,
        tools_enabled: bool,
    ) -> Result<GenerateResult, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut body = json!({
            "model": model_name,
            "max_tokens": MAX_TOKENS,
            "system": system_prompt,
            "messages": messages,
        });
        if tools_enabled {
            body["tools"] = json!(anthropic_tools());
        }

        debug!("Anthropic request: model={}, tools={}", model_name, tools_enabled);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{}: {}", status, text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content_blocks: Vec<ContentBlock> = serde_json::from_value(json["content"].clone())
            .map_err(|e| ProviderError::Parse(format!("invalid content array: {}", e)))?;

        let prompt_tokens = json["usage"]["input_tokens"].as_u64().unwrap_or(0);
        let completion_tokens = json["usage"]["output_tokens"].as_u64().unwrap_or(0);
        let token_usage = TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        };

        Ok(GenerateResult {
            content_blocks,
            token_usage,
        })
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn generate_message(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        model_name: &str,
        tools_enabled: bool,
        cancel: &CancellationToken,
    ) -> Result<GenerateResult, ProviderError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ProviderError::Interrupted),
            result = self.request(system_prompt, messages, model_name, tools_enabled) => result,
        }
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
