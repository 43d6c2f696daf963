//! LLM provider layer for the deskpilot agent runtime.
//!
//! Normalizes the supported backends (Anthropic, OpenAI, Google, proxy)
//! behind a single generate-message contract.

pub mod anthropic;
pub mod google;
pub mod model;
pub mod openai;
pub mod proxy;
pub mod registry;
pub mod tools;
pub mod traits;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use model::{resolve_model, ModelDescriptor, Provider, DEFAULT_MODEL_NAME};
pub use openai::OpenAIProvider;
pub use proxy::ProxyProvider;
pub use registry::{ProviderRegistry, PROXY_URL_ENV};
pub use traits::{LLMProvider, ProviderError};
pub use types::{
    is_computer_tool, ChatMessage, ContentBlock, GenerateResult, Role, TokenUsage,
    COMPUTER_TOOL_PREFIX, CREATE_TASK_TOOL, SET_TASK_STATUS_TOOL,
};
