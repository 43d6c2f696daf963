//! Deskpilot agent runtime.
//!
//! A single-tenant iterative control loop that drives a desktop-automation
//! task to a terminal state by repeatedly consulting an LLM and executing the
//! tool calls it emits.

pub mod assembler;
pub mod config;
pub mod dispatcher;
pub mod events;
pub mod interfaces;
pub mod metrics;
pub mod processor;
pub mod prompts;
pub mod summarizer;
pub mod types;

pub use assembler::{ConversationAssembler, TranscriptWindow};
pub use config::ProcessorConfig;
pub use dispatcher::{DispatchOutcome, StatusSignal, ToolRouter};
pub use events::{spawn_lifecycle_listener, TaskLifecycleEvent};
pub use interfaces::{
    AgentError, ComputerToolHandler, InputCapture, MessageStore, SummaryStore, TaskStore,
    ToolOutcome,
};
pub use processor::AgentProcessor;
pub use summarizer::ContextSummarizer;
pub use types::{
    CreateTaskRequest, MessageRecord, Summary, Task, TaskPatch, TaskRuntimeState, TaskStatus,
    CREATED_BY_ASSISTANT,
};
