//! System prompts fed to the model.

use chrono::Utc;

/// System prompt for the summarization call. Tools are disabled for it.
pub const SUMMARIZATION_SYSTEM_PROMPT: &str = "You are a summarization assistant. \
Condense the conversation between a user and a desktop-automation agent into a \
compact briefing that lets the agent continue the task without the full history. \
Preserve the task goal, every action already performed with its outcome, any \
credentials or identifiers surfaced along the way, and the next step that was \
about to be taken. Respond with the summary text only.";

/// User message appended to the transcript to request a summary.
pub const SUMMARIZATION_REQUEST: &str = "Summarize the conversation so far. \
Include everything needed to resume the task exactly where it left off.";

/// Synthetic advisory appended when desktop tools have been disabled.
pub const DEGRADED_TOOLS_ADVISORY: &str = "Desktop automation tools are \
currently unavailable and must not be requested. Do not emit computer_* tool \
calls; either finish the task with the information at hand or report that you \
need help.";

/// Default system prompt for the desktop-automation agent.
pub fn default_agent_system_prompt() -> String {
    format!(
        "You are a desktop-automation agent operating a real computer on behalf \
of a user. Today's date is {}.\n\n\
Work through the current task step by step using the available computer_* \
tools. Take a screenshot when you need to see the screen, and verify the \
effect of each action before moving on. Prefer keyboard navigation where it \
is more reliable than pointing.\n\n\
When the task is finished, call set_task_status with status \"completed\" and \
a short description of the outcome. If you are blocked and a human needs to \
intervene, call set_task_status with status \"needs_help\" and explain what \
is blocking you. Use create_task to queue follow-up work that should run as \
its own task rather than stretching the current one.",
        Utc::now().format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_mentions_control_tools() {
        let prompt = default_agent_system_prompt();
        assert!(prompt.contains("set_task_status"));
        assert!(prompt.contains("create_task"));
        assert!(prompt.contains("computer_"));
    }

    #[test]
    fn test_advisory_forbids_computer_tools() {
        assert!(DEGRADED_TOOLS_ADVISORY.contains("computer_"));
        assert!(DEGRADED_TOOLS_ADVISORY.contains("unavailable"));
    }
}
