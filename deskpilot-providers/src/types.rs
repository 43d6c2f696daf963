//! Shared message and content-block types for the provider contract.

use serde::{Deserialize, Serialize};

/// Tool names carrying this prefix denote desktop-automation tools.
pub const COMPUTER_TOOL_PREFIX: &str = "computer_";

/// Control tool: the model reports task completion or a request for help.
pub const SET_TASK_STATUS_TOOL: &str = "set_task_status";

/// Control tool: the model spawns a follow-up task.
pub const CREATE_TASK_TOOL: &str = "create_task";

/// Message role in conversation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A tagged element of a message's content array.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Vec<ContentBlock>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a tool-result block carrying a single text payload.
    pub fn tool_result(tool_use_id: impl Into<String>, text: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: vec![Self::text(text)],
            is_error: is_error.then_some(true),
        }
    }

    /// Whether this block requests a desktop-automation tool.
    pub fn is_computer_tool_use(&self) -> bool {
        matches!(self, Self::ToolUse { name, .. } if is_computer_tool(name))
    }
}

/// Whether a tool name denotes a desktop-automation tool.
pub fn is_computer_tool(name: &str) -> bool {
    name.starts_with(COMPUTER_TOOL_PREFIX)
}

/// A single message in the conversation passed to a provider.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Convenience for a user message holding a single text block.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![ContentBlock::text(text)])
    }
}

/// Token accounting reported by a provider for one generation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Normalized result of one generate-message call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResult {
    pub content_blocks: Vec<ContentBlock>,
    pub token_usage: TokenUsage,
}
