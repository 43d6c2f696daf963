//! Google generative-language client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::tools::google_function_declarations;
use crate::traits::{LLMProvider, ProviderError};
use crate::types::{ChatMessage, ContentBlock, GenerateResult, Role, TokenUsage};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct GoogleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, GEMINI_BASE_URL.to_string())
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
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model_name, self.api_key
        );

        let mut body = json!({
            "system_instruction": {"parts": [{"text": system_prompt}]},
            "contents": to_contents(messages),
        });
        if tools_enabled {
            body["tools"] = json!([{"functionDeclarations": google_function_declarations()}]);
        }

        debug!("Google request: model={}, tools={}", model_name, tools_enabled);

        let response = self
            .client
            .post(&url)
            .json(&body)
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

        from_candidates(&json)
    }
}

#[async_trait]
impl LLMProvider for GoogleProvider {
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
        "google"
    }
}

fn to_contents(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            let parts: Vec<Value> = message
                .content
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => json!({"text": text}),
                    ContentBlock::ToolUse { name, input, .. } => {
                        json!({"functionCall": {"name": name, "args": input}})
                    }
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => {
                        let output: String = content
                            .iter()
                            .filter_map(|b| match b {
                                ContentBlock::Text { text } => Some(text.as_str()),
                                _ => None,
                            })
                            .collect::<Vec<_>>()
                            .join("\n");
                        // call ids are synthesized as "<name>_<index>" on decode
                        let name = tool_use_id
                            .rsplit_once('_')
                            .map(|(name, _)| name)
                            .unwrap_or(tool_use_id.as_str());
                        json!({"functionResponse": {
                            "name": name,
                            "response": {"output": output, "is_error": is_error.unwrap_or(false)},
                        }})
                    }
                })
                .collect();
            json!({"role": role, "parts": parts})
        })
        .collect()
}

fn from_candidates(json: &Value) -> Result<GenerateResult, ProviderError> {
    let parts = json["candidates"]
        .get(0)
        .map(|candidate| &candidate["content"]["parts"])
        .and_then(|parts| parts.as_array())
        .ok_or_else(|| ProviderError::Parse("No candidates in response".to_string()))?;

    let mut content_blocks = Vec::new();
    for (index, part) in parts.iter().enumerate() {
        if let Some(text) = part["text"].as_str() {
            content_blocks.push(ContentBlock::text(text));
        } else if let Some(call) = part.get("functionCall") {
            let name = call["name"]
                .as_str()
                .ok_or_else(|| ProviderError::Parse("functionCall missing name".to_string()))?
                .to_string();
            content_blocks.push(ContentBlock::ToolUse {
                id: format!("{}_{}", name, index),
                name,
                input: call["args"].clone(),
            });
        }
    }

    let usage = &json["usageMetadata"];
    let token_usage = TokenUsage {
        prompt_tokens: usage["promptTokenCount"].as_u64().unwrap_or(0),
        completion_tokens: usage["candidatesTokenCount"].as_u64().unwrap_or(0),
        total_tokens: usage["totalTokenCount"].as_u64().unwrap_or(0),
    };

    Ok(GenerateResult {
        content_blocks,
        token_usage,
    })
}
