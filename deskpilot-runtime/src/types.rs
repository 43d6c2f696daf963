//! Task-domain type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deskpilot_providers::{ContentBlock, Role};

/// Origin recorded on tasks the agent spawns for itself.
pub const CREATED_BY_ASSISTANT: &str = "ASSISTANT";

/// Task lifecycle status.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    NeedsHelp,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Whether the task can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A persisted task row as seen by the processor.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
    /// Opaque persisted model field; coerced to a descriptor per iteration.
    pub model: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial update applied to a task row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Request handed to the task service when the agent spawns a follow-up task.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CreateTaskRequest {
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_by: String,
    pub model: serde_json::Value,
}

/// A persisted conversation message, ordered by creation time within a task.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    pub task_id: String,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    /// Set when the message is covered by a summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Compressed history replacing covered messages in subsequent LLM calls.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Summary {
    pub id: String,
    pub task_id: String,
    pub content: String,
}

/// Per-task ephemeral state held only by the processor, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskRuntimeState {
    pub retry_count: u32,
    pub computer_tool_failures: u32,
    pub computer_tools_disabled: bool,
}
