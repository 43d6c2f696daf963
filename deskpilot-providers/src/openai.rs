//! OpenAI chat-completions client.
//!
//! Also carries the content-block/wire conversions reused by the proxy
//! provider, which speaks the same dialect.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::tools::openai_tools;
use crate::traits::{LLMProvider, ProviderError};
use crate::types::{ChatMessage, ContentBlock, GenerateResult, Role, TokenUsage};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(OPENAI_BASE_URL.to_string(), Some(api_key))
    }

    pub fn with_base_url(base_url: String, api_key: Option<String>) -> Self {
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

    pub(crate) async fn request(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        model_name: &str,
        tools_enabled: bool,
    ) -> Result<GenerateResult, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = json!({
            "model": model_name,
            "messages": to_wire_messages(system_prompt, messages),
        });
        if tools_enabled {
            body["tools"] = json!(openai_tools());
        }

        debug!("OpenAI request: model={}, tools={}", model_name, tools_enabled);

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{}: {}", status, text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        from_wire_response(&json)
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
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
        "openai"
    }
}

/// Flatten a conversation into chat-completions messages.
///
/// Tool-result blocks become `role: tool` messages; assistant tool-use blocks
/// become `tool_calls` entries on the assistant message.
pub(crate) fn to_wire_messages(system_prompt: &str, messages: &[ChatMessage]) -> Vec<Value> {
    let mut wire = vec![json!({"role": "system", "content": system_prompt})];

    for message in messages {
        match message.role {
            Role::User => {
                let mut texts = Vec::new();
                for block in &message.content {
                    match block {
                        ContentBlock::Text { text } => texts.push(text.as_str()),
                        ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                            ..
                        } => {
                            wire.push(json!({
                                "role": "tool",
                                "tool_call_id": tool_use_id,
                                "content": flatten_text(content),
                            }));
                        }
                        ContentBlock::ToolUse { .. } => {}
                    }
                }
                if !texts.is_empty() {
                    wire.push(json!({"role": "user", "content": texts.join("\n")}));
                }
            }
            Role::Assistant => {
                let mut texts = Vec::new();
                let mut tool_calls = Vec::new();
                for block in &message.content {
                    match block {
                        ContentBlock::Text { text } => texts.push(text.as_str()),
                        ContentBlock::ToolUse { id, name, input } => {
                            tool_calls.push(json!({
                                "id": id,
                                "type": "function",
                                "function": {
                                    "name": name,
                                    "arguments": input.to_string(),
                                }
                            }));
                        }
                        ContentBlock::ToolResult { .. } => {}
                    }
                }
                let mut entry = json!({"role": "assistant"});
                entry["content"] = if texts.is_empty() {
                    Value::Null
                } else {
                    Value::String(texts.join("\n"))
                };
                if !tool_calls.is_empty() {
                    entry["tool_calls"] = json!(tool_calls);
                }
                wire.push(entry);
            }
        }
    }

    wire
}

pub(crate) fn from_wire_response(json: &Value) -> Result<GenerateResult, ProviderError> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;
    let message = &choice["message"];

    let mut content_blocks = Vec::new();
    if let Some(text) = message["content"].as_str() {
        if !text.is_empty() {
            content_blocks.push(ContentBlock::text(text));
        }
    }
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"].as_str().unwrap_or_default().to_string();
            let name = call["function"]["name"]
                .as_str()
                .ok_or_else(|| ProviderError::Parse("tool call missing name".to_string()))?
                .to_string();
            let input = call["function"]["arguments"]
                .as_str()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_else(|| json!({}));
            content_blocks.push(ContentBlock::ToolUse { id, name, input });
        }
    }

    let token_usage = TokenUsage {
        prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: json["usage"]["total_tokens"].as_u64().unwrap_or(0),
    };

    Ok(GenerateResult {
        content_blocks,
        token_usage,
    })
}

fn flatten_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
