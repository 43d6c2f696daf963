//! Processor tuning knobs.

use std::time::Duration;

/// Configuration for the agent processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Bounded retry budget for consecutive interrupts.
    pub max_interrupt_retries: u32,
    /// Delay before an interrupted iteration is rescheduled.
    pub interrupt_retry_delay: Duration,
    /// Consecutive desktop-tool failures before degradation engages.
    pub computer_tool_failure_limit: u32,
    /// Context window assumed when the descriptor does not carry one.
    pub default_context_window: u64,
    /// Fraction of the context window that triggers summarization.
    pub summarization_ratio: f64,
    /// Upper bound on the user-visible task error field.
    pub max_error_len: usize,
    /// Overrides the built-in agent system prompt when set.
    pub system_prompt: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_interrupt_retries: 3,
            interrupt_retry_delay: Duration::from_millis(500),
            computer_tool_failure_limit: 2,
            default_context_window: 200_000,
            summarization_ratio: 0.75,
            max_error_len: 500,
            system_prompt: None,
        }
    }
}
