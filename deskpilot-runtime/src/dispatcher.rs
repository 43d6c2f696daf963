//! Tool-result routing for one assistant turn.
//!
//! Classifies each content block returned by the LLM and routes it: desktop
//! tools to the computer-use handler (with failure counting and degradation),
//! `create_task` to the task service, `set_task_status` to a deferred status
//! signal applied only after all tool results exist.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use deskpilot_providers::{
    is_computer_tool, ContentBlock, CREATE_TASK_TOOL, SET_TASK_STATUS_TOOL,
};

use crate::interfaces::{AgentError, ComputerToolHandler, TaskStore};
use crate::metrics;
use crate::types::{
    CreateTaskRequest, Task, TaskPatch, TaskRuntimeState, TaskStatus, CREATED_BY_ASSISTANT,
};

/// Status change requested by the model, applied after the block sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusSignal {
    Completed { description: String },
    NeedsHelp { description: String },
}

/// Result of routing one assistant turn.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub results: Vec<ContentBlock>,
    pub status: Option<StatusSignal>,
    /// Set when the desktop-tool failure limit was crossed this turn; the
    /// iteration ends immediately and the processor stays attached.
    pub degraded: bool,
}

pub struct ToolRouter {
    tasks: Arc<dyn TaskStore>,
    computer: Arc<dyn ComputerToolHandler>,
    failure_limit: u32,
}

impl ToolRouter {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        computer: Arc<dyn ComputerToolHandler>,
        failure_limit: u32,
    ) -> Self {
        Self {
            tasks,
            computer,
            failure_limit,
        }
    }

    pub async fn route(
        &self,
        task: &Task,
        blocks: &[ContentBlock],
        state: &mut TaskRuntimeState,
    ) -> Result<DispatchOutcome, AgentError> {
        let mut outcome = DispatchOutcome::default();

        for block in blocks {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };

            if is_computer_tool(name) {
                if self
                    .dispatch_computer_tool(task, id, name, input, state, &mut outcome)
                    .await?
                {
                    return Ok(outcome);
                }
            } else if name == CREATE_TASK_TOOL {
                self.dispatch_create_task(task, id, input, &mut outcome)
                    .await?;
            } else if name == SET_TASK_STATUS_TOOL {
                record_status_request(id, input, &mut outcome);
            } else {
                warn!("Unsupported tool requested: {}", name);
                outcome.results.push(ContentBlock::tool_result(
                    id.clone(),
                    format!("Unsupported tool: {}", name),
                    true,
                ));
            }
        }

        Ok(outcome)
    }

    /// Returns true when degradation engaged and the sweep must stop.
    async fn dispatch_computer_tool(
        &self,
        task: &Task,
        id: &str,
        name: &str,
        input: &serde_json::Value,
        state: &mut TaskRuntimeState,
        outcome: &mut DispatchOutcome,
    ) -> Result<bool, AgentError> {
        if state.computer_tools_disabled {
            warn!(
                "Dropping {} for task {}: desktop tools are disabled",
                name, task.id
            );
            outcome.results.push(ContentBlock::tool_result(
                id,
                "Desktop automation tools are disabled for this task",
                true,
            ));
            return Ok(false);
        }

        info!("Executing desktop tool {} for task {}", name, task.id);
        let result = self.computer.handle_computer_tool_use(name, input).await;
        let failed = result.is_error;
        outcome.results.push(ContentBlock::ToolResult {
            tool_use_id: id.to_string(),
            content: result.content,
            is_error: failed.then_some(true),
        });

        if failed {
            state.computer_tool_failures += 1;
            metrics::increment_computer_tool_failures();
            warn!(
                "Desktop tool {} failed for task {} ({} consecutive failure(s))",
                name, task.id, state.computer_tool_failures
            );

            if state.computer_tool_failures >= self.failure_limit {
                state.computer_tools_disabled = true;
                self.tasks
                    .update(
                        &task.id,
                        TaskPatch::new().status(TaskStatus::NeedsHelp).error(
                            "Desktop automation is unavailable after repeated tool \
                             failures; operator assistance is required",
                        ),
                    )
                    .await?;
                outcome.degraded = true;
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn dispatch_create_task(
        &self,
        task: &Task,
        id: &str,
        input: &serde_json::Value,
        outcome: &mut DispatchOutcome,
    ) -> Result<(), AgentError> {
        let description = input["description"].as_str().unwrap_or_default().to_string();
        let task_type = input["type"].as_str().unwrap_or("immediate").to_uppercase();
        let priority = input["priority"].as_str().unwrap_or("medium").to_uppercase();
        let scheduled_for = input["scheduledFor"]
            .as_str()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc));

        info!("Creating follow-up task for {}: {}", task.id, description);
        self.tasks
            .create(CreateTaskRequest {
                description,
                task_type,
                priority,
                scheduled_for,
                created_by: CREATED_BY_ASSISTANT.to_string(),
                model: task.model.clone(),
            })
            .await?;

        outcome
            .results
            .push(ContentBlock::tool_result(id, "The task has been created", false));
        Ok(())
    }
}

fn record_status_request(id: &str, input: &serde_json::Value, outcome: &mut DispatchOutcome) {
    let status = input["status"].as_str().unwrap_or_default();
    let description = input["description"].as_str().unwrap_or_default().to_string();

    outcome.results.push(ContentBlock::tool_result(
        id,
        description.clone(),
        status == "failed",
    ));

    // The transition is deferred until all tool results are persisted; only
    // "completed" and "needs_help" ever transition the task.
    match status {
        "completed" => outcome.status = Some(StatusSignal::Completed { description }),
        "needs_help" => outcome.status = Some(StatusSignal::NeedsHelp { description }),
        _ => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::interfaces::ToolOutcome;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    struct RecordingTaskStore {
        updates: Mutex<Vec<(String, TaskPatch)>>,
        created: Mutex<Vec<CreateTaskRequest>>,
    }

    impl RecordingTaskStore {
        fn new() -> Self {
            Self {
                updates: Mutex::new(vec![]),
                created: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl TaskStore for RecordingTaskStore {
        async fn find_by_id(&self, _task_id: &str) -> Result<Option<Task>, AgentError> {
            Ok(None)
        }

        async fn update(&self, task_id: &str, patch: TaskPatch) -> Result<Task, AgentError> {
            self.updates.lock().push((task_id.to_string(), patch));
            Ok(sample_task())
        }

        async fn create(&self, request: CreateTaskRequest) -> Result<Task, AgentError> {
            self.created.lock().push(request);
            Ok(sample_task())
        }
    }

    struct ScriptedHandler {
        outcomes: Mutex<std::collections::VecDeque<ToolOutcome>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedHandler {
        fn new(outcomes: Vec<ToolOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl ComputerToolHandler for ScriptedHandler {
        async fn handle_computer_tool_use(
            &self,
            name: &str,
            _input: &serde_json::Value,
        ) -> ToolOutcome {
            self.calls.lock().push(name.to_string());
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or_else(|| ToolOutcome::success(vec![ContentBlock::text("ok")]))
        }
    }

    fn sample_task() -> Task {
        Task {
            id: "t1".to_string(),
            description: "open the settings panel".to_string(),
            status: TaskStatus::Running,
            model: json!({"provider": "openai", "name": "gpt-4.1"}),
            completed_at: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    fn router(handler: ScriptedHandler) -> (ToolRouter, Arc<RecordingTaskStore>) {
        let tasks = Arc::new(RecordingTaskStore::new());
        (ToolRouter::new(tasks.clone(), Arc::new(handler), 2), tasks)
    }

    #[tokio::test]
    async fn test_text_blocks_produce_no_results() {
        let (router, _) = router(ScriptedHandler::new(vec![]));
        let mut state = TaskRuntimeState::default();

        let outcome = router
            .route(&sample_task(), &[ContentBlock::text("thinking")], &mut state)
            .await
            .unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.status.is_none());
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn test_computer_tool_success() {
        let handler = ScriptedHandler::new(vec![ToolOutcome::success(vec![ContentBlock::text(
            "captured",
        )])]);
        let (router, _) = router(handler);
        let mut state = TaskRuntimeState::default();

        let outcome = router
            .route(
                &sample_task(),
                &[tool_use("tu1", "computer_screenshot", json!({}))],
                &mut state,
            )
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        match &outcome.results[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                is_error,
                ..
            } => {
                assert_eq!(tool_use_id, "tu1");
                assert_eq!(*is_error, None);
            }
            _ => panic!("Expected ToolResult"),
        }
        assert_eq!(state.computer_tool_failures, 0);
    }

    #[tokio::test]
    async fn test_single_failure_counts_without_degrading() {
        let handler = ScriptedHandler::new(vec![ToolOutcome::error("no display")]);
        let (router, tasks) = router(handler);
        let mut state = TaskRuntimeState::default();

        let outcome = router
            .route(
                &sample_task(),
                &[tool_use("tu1", "computer_screenshot", json!({}))],
                &mut state,
            )
            .await
            .unwrap();

        assert!(!outcome.degraded);
        assert_eq!(state.computer_tool_failures, 1);
        assert!(!state.computer_tools_disabled);
        assert!(tasks.updates.lock().is_empty());
    }

    #[tokio::test]
    async fn test_second_failure_degrades_and_stops_sweep() {
        let handler = ScriptedHandler::new(vec![
            ToolOutcome::error("no display"),
            ToolOutcome::error("still no display"),
        ]);
        let (router, tasks) = router(handler);
        let mut state = TaskRuntimeState::default();

        let blocks = [
            tool_use("tu1", "computer_screenshot", json!({})),
            tool_use("tu2", "computer_screenshot", json!({})),
            tool_use("tu3", "computer_type_text", json!({"text": "never runs"})),
        ];
        let outcome = router.route(&sample_task(), &blocks, &mut state).await.unwrap();

        assert!(outcome.degraded);
        assert!(state.computer_tools_disabled);
        assert_eq!(state.computer_tool_failures, 2);
        // the sweep stopped before the third block
        assert_eq!(outcome.results.len(), 2);

        let updates = tasks.updates.lock();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.status, Some(TaskStatus::NeedsHelp));
        assert!(updates[0].1.error.as_deref().unwrap().contains("Desktop automation"));
    }

    #[tokio::test]
    async fn test_disabled_tools_are_not_dispatched() {
        let handler = ScriptedHandler::new(vec![]);
        let (router, _) = router(handler);
        let mut state = TaskRuntimeState {
            computer_tools_disabled: true,
            ..Default::default()
        };

        let outcome = router
            .route(
                &sample_task(),
                &[tool_use("tu1", "computer_screenshot", json!({}))],
                &mut state,
            )
            .await
            .unwrap();

        // error result emitted, handler never invoked, counter untouched
        assert_eq!(outcome.results.len(), 1);
        match &outcome.results[0] {
            ContentBlock::ToolResult { is_error, .. } => assert_eq!(*is_error, Some(true)),
            _ => panic!("Expected ToolResult"),
        }
        assert_eq!(state.computer_tool_failures, 0);
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn test_create_task_uppercases_and_delegates() {
        let (router, tasks) = router(ScriptedHandler::new(vec![]));
        let mut state = TaskRuntimeState::default();

        let outcome = router
            .route(
                &sample_task(),
                &[tool_use(
                    "tu1",
                    "create_task",
                    json!({
                        "description": "clean up downloads",
                        "type": "scheduled",
                        "priority": "high",
                        "scheduledFor": "2026-08-03T09:00:00Z"
                    }),
                )],
                &mut state,
            )
            .await
            .unwrap();

        let created = tasks.created.lock();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].task_type, "SCHEDULED");
        assert_eq!(created[0].priority, "HIGH");
        assert_eq!(created[0].created_by, CREATED_BY_ASSISTANT);
        assert!(created[0].scheduled_for.is_some());
        assert_eq!(created[0].model, sample_task().model);

        match &outcome.results[0] {
            ContentBlock::ToolResult { content, is_error, .. } => {
                assert_eq!(*is_error, None);
                assert_eq!(content[0], ContentBlock::text("The task has been created"));
            }
            _ => panic!("Expected ToolResult"),
        }
    }

    #[tokio::test]
    async fn test_set_task_status_completed_defers_transition() {
        let (router, tasks) = router(ScriptedHandler::new(vec![]));
        let mut state = TaskRuntimeState::default();

        let outcome = router
            .route(
                &sample_task(),
                &[tool_use(
                    "tu1",
                    "set_task_status",
                    json!({"status": "completed", "description": "done"}),
                )],
                &mut state,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome.status,
            Some(StatusSignal::Completed {
                description: "done".to_string()
            })
        );
        // no transition inside the sweep
        assert!(tasks.updates.lock().is_empty());
        match &outcome.results[0] {
            ContentBlock::ToolResult { content, is_error, .. } => {
                assert_eq!(*is_error, None);
                assert_eq!(content[0], ContentBlock::text("done"));
            }
            _ => panic!("Expected ToolResult"),
        }
    }

    #[tokio::test]
    async fn test_set_task_status_failed_marks_result_only() {
        let (router, tasks) = router(ScriptedHandler::new(vec![]));
        let mut state = TaskRuntimeState::default();

        let outcome = router
            .route(
                &sample_task(),
                &[tool_use(
                    "tu1",
                    "set_task_status",
                    json!({"status": "failed", "description": "could not log in"}),
                )],
                &mut state,
            )
            .await
            .unwrap();

        // error-marked result, but no status signal and no transition
        assert!(outcome.status.is_none());
        assert!(tasks.updates.lock().is_empty());
        match &outcome.results[0] {
            ContentBlock::ToolResult { is_error, .. } => assert_eq!(*is_error, Some(true)),
            _ => panic!("Expected ToolResult"),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_yields_error_result() {
        let (router, _) = router(ScriptedHandler::new(vec![]));
        let mut state = TaskRuntimeState::default();

        let outcome = router
            .route(
                &sample_task(),
                &[tool_use("tu1", "telepathy", json!({}))],
                &mut state,
            )
            .await
            .unwrap();

        match &outcome.results[0] {
            ContentBlock::ToolResult { is_error, content, .. } => {
                assert_eq!(*is_error, Some(true));
                assert_eq!(content[0], ContentBlock::text("Unsupported tool: telepathy"));
            }
            _ => panic!("Expected ToolResult"),
        }
    }
}
