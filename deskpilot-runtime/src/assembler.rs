//! Conversation assembly for one LLM turn.

use std::sync::Arc;

use tracing::debug;

use deskpilot_providers::ChatMessage;

use crate::interfaces::{AgentError, MessageStore, SummaryStore};
use crate::prompts::DEGRADED_TOOLS_ADVISORY;

/// The message sequence for one turn, plus the ids of the persisted messages
/// it contains so a later summary can be attached to exactly that set.
#[derive(Debug, Clone)]
pub struct TranscriptWindow {
    pub messages: Vec<ChatMessage>,
    pub covered_ids: Vec<String>,
}

/// Builds the ordered message sequence passed to the LLM: the latest summary
/// (as a synthetic user message), the unsummarized tail, and any advisory.
/// Synthetic messages are never persisted.
pub struct ConversationAssembler {
    messages: Arc<dyn MessageStore>,
    summaries: Arc<dyn SummaryStore>,
}

impl ConversationAssembler {
    pub fn new(messages: Arc<dyn MessageStore>, summaries: Arc<dyn SummaryStore>) -> Self {
        Self {
            messages,
            summaries,
        }
    }

    pub async fn assemble(
        &self,
        task_id: &str,
        computer_tools_disabled: bool,
    ) -> Result<TranscriptWindow, AgentError> {
        let latest_summary = self.summaries.find_latest(task_id).await?;
        let records = self.messages.find_unsummarized(task_id).await?;

        debug!(
            "Assembling conversation for task {}: {} unsummarized message(s), summary={}",
            task_id,
            records.len(),
            latest_summary.is_some()
        );

        let mut messages = Vec::with_capacity(records.len() + 2);
        if let Some(summary) = latest_summary {
            messages.push(ChatMessage::user_text(summary.content));
        }

        let covered_ids: Vec<String> = records.iter().map(|record| record.id.clone()).collect();
        for record in records {
            messages.push(ChatMessage {
                role: record.role,
                content: record.content,
            });
        }

        if computer_tools_disabled {
            messages.push(ChatMessage::user_text(DEGRADED_TOOLS_ADVISORY));
        }

        Ok(TranscriptWindow {
            messages,
            covered_ids,
        })
    }
}
