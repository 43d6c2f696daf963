//! Context-window summarization.
//!
//! After an assistant turn is persisted, token usage is checked against the
//! model's context window; past the threshold a second LLM call compresses
//! the history. Summarization failures are logged and swallowed; they never
//! fail the task.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use deskpilot_providers::{ChatMessage, ContentBlock, LLMProvider, ModelDescriptor, TokenUsage};

use crate::config::ProcessorConfig;
use crate::interfaces::{AgentError, MessageStore, SummaryStore};
use crate::metrics;
use crate::prompts::{SUMMARIZATION_REQUEST, SUMMARIZATION_SYSTEM_PROMPT};

pub struct ContextSummarizer {
    messages: Arc<dyn MessageStore>,
    summaries: Arc<dyn SummaryStore>,
    default_context_window: u64,
    ratio: f64,
}

impl ContextSummarizer {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        summaries: Arc<dyn SummaryStore>,
        config: &ProcessorConfig,
    ) -> Self {
        Self {
            messages,
            summaries,
            default_context_window: config.default_context_window,
            ratio: config.summarization_ratio,
        }
    }

    /// Whether the reported usage crosses the summarization threshold.
    pub fn should_summarize(&self, descriptor: &ModelDescriptor, usage: &TokenUsage) -> bool {
        let window = descriptor
            .context_window
            .unwrap_or(self.default_context_window);
        let threshold = (window as f64 * self.ratio) as u64;
        usage.total_tokens >= threshold
    }

    /// Run the summarization policy for one turn. Errors are swallowed.
    #[allow(clippy::too_many_arguments)]
    pub async fn maybe_summarize(
        &self,
        task_id: &str,
        provider: &dyn LLMProvider,
        descriptor: &ModelDescriptor,
        transcript: &[ChatMessage],
        covered_ids: &[String],
        usage: &TokenUsage,
        cancel: &CancellationToken,
    ) {
        if !self.should_summarize(descriptor, usage) {
            return;
        }
        if covered_ids.is_empty() {
            debug!("Threshold crossed for task {} but no messages to cover", task_id);
            return;
        }

        info!(
            "Token usage {} crossed summarization threshold for task {}, compressing history",
            usage.total_tokens, task_id
        );

        match self
            .summarize(task_id, provider, descriptor, transcript, covered_ids, cancel)
            .await
        {
            Ok(()) => metrics::increment_summaries_created(),
            Err(e) => {
                warn!("Summarization failed for task {}: {}", task_id, e);
                metrics::increment_summarization_failures();
            }
        }
    }

    async fn summarize(
        &self,
        task_id: &str,
        provider: &dyn LLMProvider,
        descriptor: &ModelDescriptor,
        transcript: &[ChatMessage],
        covered_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), AgentError> {
        let mut messages = transcript.to_vec();
        messages.push(ChatMessage::user_text(SUMMARIZATION_REQUEST));

        let response = provider
            .generate_message(
                SUMMARIZATION_SYSTEM_PROMPT,
                &messages,
                &descriptor.name,
                false,
                cancel,
            )
            .await?;

        let body: String = response
            .content_blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        let summary = self.summaries.create(task_id, &body).await?;
        self.messages
            .attach_summary(task_id, &summary.id, covered_ids)
            .await?;

        info!(
            "Summary {} now covers {} message(s) for task {}",
            summary.id,
            covered_ids.len(),
            task_id
        );
        Ok(())
    }
}
