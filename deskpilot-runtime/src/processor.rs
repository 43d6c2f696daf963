//! The agent processor: lifecycle controller and iteration loop.
//!
//! Single-tenant: at most one iteration of one task advances at a time.
//! Iterations are scheduled on the executor rather than recursed so that
//! lifecycle events are delivered between turns, and every iteration runs
//! under a fresh cancellation token.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use deskpilot_providers::{resolve_model, ProviderRegistry, Role};

use crate::assembler::ConversationAssembler;
use crate::config::ProcessorConfig;
use crate::dispatcher::{StatusSignal, ToolRouter};
use crate::interfaces::{
    AgentError, ComputerToolHandler, InputCapture, MessageStore, SummaryStore, TaskStore,
};
use crate::metrics;
use crate::prompts::default_agent_system_prompt;
use crate::summarizer::ContextSummarizer;
use crate::types::{TaskPatch, TaskRuntimeState, TaskStatus};

/// Fallback for empty error messages.
const GENERIC_PROCESSING_ERROR: &str = "Processing error";

/// The singleton trio: holding an entry means the processor is processing.
struct ActiveTask {
    task_id: String,
    cancel: CancellationToken,
}

enum IterationOutcome {
    /// Schedule the next turn.
    Continue,
    /// Stop iterating but stay attached to the task (degradation).
    Hold,
    /// Processing state already released.
    Stop,
}

pub struct AgentProcessor {
    tasks: Arc<dyn TaskStore>,
    messages: Arc<dyn MessageStore>,
    registry: Arc<ProviderRegistry>,
    input_capture: Arc<dyn InputCapture>,
    assembler: ConversationAssembler,
    summarizer: ContextSummarizer,
    router: ToolRouter,
    system_prompt: String,
    config: ProcessorConfig,
    active: Mutex<Option<ActiveTask>>,
    task_state: Mutex<HashMap<String, TaskRuntimeState>>,
    /// Self-handle for scheduling iterations onto the executor.
    weak: Weak<AgentProcessor>,
}

impl AgentProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        messages: Arc<dyn MessageStore>,
        summaries: Arc<dyn SummaryStore>,
        registry: Arc<ProviderRegistry>,
        computer: Arc<dyn ComputerToolHandler>,
        input_capture: Arc<dyn InputCapture>,
        config: ProcessorConfig,
    ) -> Arc<Self> {
        let assembler = ConversationAssembler::new(messages.clone(), summaries.clone());
        let summarizer = ContextSummarizer::new(messages.clone(), summaries, &config);
        let router = ToolRouter::new(tasks.clone(), computer, config.computer_tool_failure_limit);
        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(default_agent_system_prompt);

        Arc::new_cyclic(|weak| Self {
            tasks,
            messages,
            registry,
            input_capture,
            assembler,
            summarizer,
            router,
            system_prompt,
            config,
            active: Mutex::new(None),
            task_state: Mutex::new(HashMap::new()),
            weak: weak.clone(),
        })
    }

    pub fn is_processing(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn current_task_id(&self) -> Option<String> {
        self.active.lock().as_ref().map(|a| a.task_id.clone())
    }

    /// Begin processing a task. If the processor is already busy the request
    /// is logged and dropped; there is no queueing.
    pub fn process_task(&self, task_id: &str) {
        {
            let mut active = self.active.lock();
            if let Some(current) = active.as_ref() {
                warn!(
                    "Processor busy with task {}, ignoring start for {}",
                    current.task_id, task_id
                );
                return;
            }
            *active = Some(ActiveTask {
                task_id: task_id.to_string(),
                cancel: CancellationToken::new(),
            });
        }
        info!("Starting processing for task {}", task_id);
        self.schedule_iteration(task_id.to_string());
    }

    /// User takeover: abort the in-flight work on this task and hand input to
    /// the capture collaborator. Processing state is kept; the loop detects
    /// the task's status change and winds down on its own.
    pub async fn handle_takeover(&self, task_id: &str) {
        {
            let active = self.active.lock();
            if let Some(current) = active.as_ref() {
                if current.task_id == task_id {
                    info!("Takeover of task {}, cancelling current iteration", task_id);
                    current.cancel.cancel();
                }
            }
        }
        self.input_capture.start(task_id).await;
    }

    /// Resume after a takeover: if the processor still holds the task, arm a
    /// fresh cancellation handle and enqueue an iteration.
    pub fn handle_resume(&self, task_id: &str) {
        let resumed = {
            let mut active = self.active.lock();
            match active.as_mut() {
                Some(current) if current.task_id == task_id => {
                    current.cancel = CancellationToken::new();
                    true
                }
                _ => false,
            }
        };
        if resumed {
            info!("Resuming task {}", task_id);
            self.schedule_iteration(task_id.to_string());
        } else {
            debug!("Resume ignored for task {}: not currently held", task_id);
        }
    }

    /// Cancel processing of the named task.
    pub async fn handle_cancel(&self, task_id: &str) {
        let held = {
            let mut active = self.active.lock();
            match active.as_ref() {
                Some(current) if current.task_id == task_id => {
                    current.cancel.cancel();
                    *active = None;
                    true
                }
                _ => false,
            }
        };
        if held {
            info!("Cancelled processing for task {}", task_id);
            self.task_state.lock().remove(task_id);
            self.input_capture.stop().await;
        } else {
            debug!("Cancel ignored for task {}: not currently held", task_id);
        }
    }

    /// Idempotent shutdown of whatever is currently processing.
    pub async fn stop_processing(&self) {
        let previous = self.active.lock().take();
        if let Some(current) = previous {
            info!("Stopping processing for task {}", current.task_id);
            current.cancel.cancel();
            self.task_state.lock().remove(&current.task_id);
        }
        self.input_capture.stop().await;
    }

    fn schedule_iteration(&self, task_id: String) {
        let Some(processor) = self.weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            processor.run_iteration(task_id).await;
        });
    }

    fn holds(&self, task_id: &str) -> bool {
        matches!(self.active.lock().as_ref(), Some(current) if current.task_id == task_id)
    }

    /// Arm a fresh cancellation token for the next iteration of `task_id`.
    /// Returns `None` when the processor no longer holds the task.
    fn begin_iteration(&self, task_id: &str) -> Option<CancellationToken> {
        let mut active = self.active.lock();
        match active.as_mut() {
            Some(current) if current.task_id == task_id => {
                let fresh = CancellationToken::new();
                current.cancel = fresh.clone();
                Some(fresh)
            }
            _ => None,
        }
    }

    /// Clear singleton state and the task's ephemeral entry.
    fn release(&self, task_id: &str) {
        {
            let mut active = self.active.lock();
            if matches!(active.as_ref(), Some(current) if current.task_id == task_id) {
                *active = None;
            }
        }
        self.task_state.lock().remove(task_id);
    }

    fn run_iteration<'a>(
        &'a self,
        task_id: String,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let Some(cancel) = self.begin_iteration(&task_id) else {
                debug!("Iteration for task {} dropped: no longer held", task_id);
                return;
            };

            let _timer = metrics::MetricTimer::new("agent_iteration_latency");
            match self.iterate(&task_id, &cancel).await {
                Ok(IterationOutcome::Continue) => {
                    if self.holds(&task_id) {
                        self.schedule_iteration(task_id);
                    }
                }
                Ok(IterationOutcome::Hold) | Ok(IterationOutcome::Stop) => {}
                Err(err) => self.handle_iteration_error(&task_id, err).await,
            }
        })
    }

    async fn iterate(
        &self,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<IterationOutcome, AgentError> {
        let Some(task) = self.tasks.find_by_id(task_id).await? else {
            warn!("Task {} no longer exists, stopping", task_id);
            self.release(task_id);
            return Ok(IterationOutcome::Stop);
        };

        if task.status != TaskStatus::Running {
            info!(
                "Task {} observed in status {:?}, winding down",
                task_id, task.status
            );
            self.release(task_id);
            return Ok(IterationOutcome::Stop);
        }

        let computer_tools_disabled = self
            .task_state
            .lock()
            .get(task_id)
            .map(|state| state.computer_tools_disabled)
            .unwrap_or(false);

        let window = self
            .assembler
            .assemble(task_id, computer_tools_disabled)
            .await?;

        let descriptor = resolve_model(&task.model);
        let Some(provider) = self.registry.resolve(descriptor.provider) else {
            self.fail_task(task_id, &format!("no service for provider {}", descriptor.provider))
                .await;
            return Ok(IterationOutcome::Stop);
        };

        debug!(
            "Generating for task {} via {} ({})",
            task_id,
            provider.name(),
            descriptor.name
        );
        let generation = {
            let _timer = metrics::MetricTimer::new("llm_generation_latency");
            provider
                .generate_message(&self.system_prompt, &window.messages, &descriptor.name, true, cancel)
                .await?
        };

        // the interrupt budget only covers consecutive interrupts
        self.task_state
            .lock()
            .entry(task_id.to_string())
            .or_default()
            .retry_count = 0;

        if generation.content_blocks.is_empty() {
            self.fail_task(task_id, "No content blocks returned from model")
                .await;
            return Ok(IterationOutcome::Stop);
        }

        self.messages
            .create(task_id, Role::Assistant, generation.content_blocks.clone())
            .await?;

        self.summarizer
            .maybe_summarize(
                task_id,
                provider.as_ref(),
                &descriptor,
                &window.messages,
                &window.covered_ids,
                &generation.token_usage,
                cancel,
            )
            .await;

        let mut state = self
            .task_state
            .lock()
            .get(task_id)
            .copied()
            .unwrap_or_default();
        let outcome = self
            .router
            .route(&task, &generation.content_blocks, &mut state)
            .await?;
        self.task_state.lock().insert(task_id.to_string(), state);

        if outcome.degraded {
            warn!(
                "Desktop tool degradation engaged for task {}; awaiting operator",
                task_id
            );
            return Ok(IterationOutcome::Hold);
        }

        if !outcome.results.is_empty() {
            self.messages
                .create(task_id, Role::User, outcome.results)
                .await?;
        }

        match outcome.status {
            Some(StatusSignal::Completed { description }) => {
                info!("Task {} completed: {}", task_id, description);
                self.tasks
                    .update(
                        task_id,
                        TaskPatch::new()
                            .status(TaskStatus::Completed)
                            .completed_at(Utc::now()),
                    )
                    .await?;
            }
            Some(StatusSignal::NeedsHelp { description }) => {
                info!("Task {} requests help: {}", task_id, description);
                self.tasks
                    .update(task_id, TaskPatch::new().status(TaskStatus::NeedsHelp))
                    .await?;
            }
            None => {}
        }

        Ok(IterationOutcome::Continue)
    }

    async fn handle_iteration_error(&self, task_id: &str, err: AgentError) {
        match err {
            AgentError::Interrupted => {
                if !self.holds(task_id) {
                    debug!("Interrupt for released task {}, dropping", task_id);
                    return;
                }

                let retries = {
                    let mut states = self.task_state.lock();
                    let state = states.entry(task_id.to_string()).or_default();
                    state.retry_count += 1;
                    state.retry_count
                };

                if retries <= self.config.max_interrupt_retries {
                    metrics::increment_interrupt_retries();
                    warn!(
                        "Iteration interrupted for task {}, retry {}/{}",
                        task_id, retries, self.config.max_interrupt_retries
                    );
                    let Some(processor) = self.weak.upgrade() else {
                        return;
                    };
                    let task_id = task_id.to_string();
                    let delay = self.config.interrupt_retry_delay;
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        processor.run_iteration(task_id).await;
                    });
                } else {
                    let message = format!(
                        "Task was interrupted {} times in a row; manual intervention is required",
                        retries
                    );
                    warn!("Interrupt budget exhausted for task {}", task_id);
                    if let Err(e) = self
                        .tasks
                        .update(
                            task_id,
                            TaskPatch::new()
                                .status(TaskStatus::NeedsHelp)
                                .error(clamp_error(&message, self.config.max_error_len)),
                        )
                        .await
                    {
                        error!("Failed to record interrupt exhaustion for {}: {}", task_id, e);
                    }
                    self.release(task_id);
                }
            }
            other => {
                if !self.holds(task_id) {
                    debug!(
                        "Error after release for task {}, not overwriting status: {}",
                        task_id, other
                    );
                    return;
                }
                self.fail_task(task_id, &other.to_string()).await;
            }
        }
    }

    async fn fail_task(&self, task_id: &str, message: &str) {
        let message = clamp_error(message, self.config.max_error_len);
        error!("Task {} failed: {}", task_id, message);
        if let Err(e) = self
            .tasks
            .update(
                task_id,
                TaskPatch::new().status(TaskStatus::Failed).error(message),
            )
            .await
        {
            error!("Failed to record failure for task {}: {}", task_id, e);
        }
        self.release(task_id);
    }
}

/// Cap a user-visible error message, falling back when it is empty.
fn clamp_error(message: &str, max_len: usize) -> String {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return GENERIC_PROCESSING_ERROR.to_string();
    }
    trimmed.chars().take(max_len).collect()
}
