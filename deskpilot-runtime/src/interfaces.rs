//! Abstract interfaces for the processor's external collaborators.

use async_trait::async_trait;
use thiserror::Error;

use deskpilot_providers::{ContentBlock, ProviderError, Role};

use crate::types::{CreateTaskRequest, MessageRecord, Summary, Task, TaskPatch};

/// Errors surfaced inside an iteration.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Cooperative-abort interrupt; handled with bounded retry, never as a
    /// task failure.
    #[error("task processing interrupted")]
    Interrupted,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Interrupted => AgentError::Interrupted,
            other => AgentError::Provider(other.to_string()),
        }
    }
}

/// Task persistence interface.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>, AgentError>;

    async fn update(&self, task_id: &str, patch: TaskPatch) -> Result<Task, AgentError>;

    async fn create(&self, request: CreateTaskRequest) -> Result<Task, AgentError>;
}

/// Message persistence interface.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Messages with no summary attached, ordered by creation time.
    async fn find_unsummarized(&self, task_id: &str) -> Result<Vec<MessageRecord>, AgentError>;

    async fn create(
        &self,
        task_id: &str,
        role: Role,
        content: Vec<ContentBlock>,
    ) -> Result<MessageRecord, AgentError>;

    /// Mark the given messages as covered by a summary.
    async fn attach_summary(
        &self,
        task_id: &str,
        summary_id: &str,
        message_ids: &[String],
    ) -> Result<(), AgentError>;
}

/// Summary persistence interface.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn find_latest(&self, task_id: &str) -> Result<Option<Summary>, AgentError>;

    async fn create(&self, task_id: &str, content: &str) -> Result<Summary, AgentError>;
}

/// Input-capture collaborator engaged during user takeover.
#[async_trait]
pub trait InputCapture: Send + Sync {
    async fn start(&self, task_id: &str);

    async fn stop(&self);
}

/// Result of one desktop tool execution. Failures are reported in-band so
/// they can be counted toward degradation rather than aborting the iteration.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub content: Vec<ContentBlock>,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn success(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: true,
        }
    }
}

/// Desktop tool execution backend.
#[async_trait]
pub trait ComputerToolHandler: Send + Sync {
    async fn handle_computer_tool_use(
        &self,
        name: &str,
        input: &serde_json::Value,
    ) -> ToolOutcome;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_classification_from_provider() {
        let err: AgentError = ProviderError::Interrupted.into();
        assert!(matches!(err, AgentError::Interrupted));

        let err: AgentError = ProviderError::Api("503: overloaded".to_string()).into();
        match err {
            AgentError::Provider(msg) => assert!(msg.contains("overloaded")),
            _ => panic!("Expected Provider error"),
        }
    }

    #[test]
    fn test_tool_outcome_helpers() {
        let ok = ToolOutcome::success(vec![ContentBlock::text("captured")]);
        assert!(!ok.is_error);

        let failed = ToolOutcome::error("no display");
        assert!(failed.is_error);
        match &failed.content[0] {
            ContentBlock::Text { text } => assert_eq!(text, "no display"),
            _ => panic!("Expected Text"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = AgentError::Store("connection reset".to_string());
        assert_eq!(err.to_string(), "Store error: connection reset");
    }
}
