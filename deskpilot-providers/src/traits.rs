//! The provider contract every LLM backend implements.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::types::{ChatMessage, GenerateResult};

/// Provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Cooperative cancellation surfaced mid-call. The loop treats this as
    /// retryable, never as a task failure.
    #[error("generation interrupted")]
    Interrupted,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API error: {0}")]
    Api(String),
}

/// One LLM backend behind the generate-message contract.
///
/// Implementations must honor `cancel` (terminating the in-flight HTTP call
/// and returning [`ProviderError::Interrupted`]) and must return an empty
/// content-block list only when the model truly produced nothing.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate_message(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        model_name: &str,
        tools_enabled: bool,
        cancel: &CancellationToken,
    ) -> Result<GenerateResult, ProviderError>;

    fn name(&self) -> &str;
}
