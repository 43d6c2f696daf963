//! Lifecycle event channel.
//!
//! External surfaces emit takeover/resume/cancel events; a listener task
//! forwards them to the processor so event delivery interleaves with
//! iterations on the executor.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::processor::AgentProcessor;

/// Lifecycle events consumed by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskLifecycleEvent {
    Takeover { task_id: String },
    Resume { task_id: String },
    Cancel { task_id: String },
}

/// Spawn a listener draining lifecycle events into the processor. The task
/// ends when all senders are dropped.
pub fn spawn_lifecycle_listener(
    processor: Arc<AgentProcessor>,
    mut events: mpsc::Receiver<TaskLifecycleEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Lifecycle event: {:?}", event);
            match event {
                TaskLifecycleEvent::Takeover { task_id } => {
                    processor.handle_takeover(&task_id).await;
                }
                TaskLifecycleEvent::Resume { task_id } => {
                    processor.handle_resume(&task_id);
                }
                TaskLifecycleEvent::Cancel { task_id } => {
                    processor.handle_cancel(&task_id).await;
                }
            }
        }
        debug!("Lifecycle event channel closed");
    })
}
