//! Metrics instrumentation for processor observability.

use std::time::Instant;

/// Record full iteration latency.
pub fn record_iteration_latency(duration_ms: f64) {
    metrics::histogram!("agent_iteration_latency", duration_ms);
}

/// Record LLM generation latency.
pub fn record_generation_latency(duration_ms: f64) {
    metrics::histogram!("llm_generation_latency", duration_ms);
}

/// Increment interrupt-retry counter.
pub fn increment_interrupt_retries() {
    metrics::counter!("interrupt_retries", 1);
}

/// Increment desktop-tool failure counter.
pub fn increment_computer_tool_failures() {
    metrics::counter!("computer_tool_failures", 1);
}

/// Increment counter of summaries written.
pub fn increment_summaries_created() {
    metrics::counter!("summaries_created", 1);
}

/// Increment counter of swallowed summarization failures.
pub fn increment_summarization_failures() {
    metrics::counter!("summarization_failures", 1);
}

/// RAII timer for automatic metric recording.
pub struct MetricTimer {
    start: Instant,
    metric_name: &'static str,
}

impl MetricTimer {
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }
}

impl Drop for MetricTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        match self.metric_name {
            "agent_iteration_latency" => record_iteration_latency(duration_ms),
            "llm_generation_latency" => record_generation_latency(duration_ms),
            _ => {}
        }
    }
}
