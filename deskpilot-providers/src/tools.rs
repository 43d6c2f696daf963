//! Tool schema catalogue advertised to the model.
//!
//! One neutral definition per tool, converted into each backend's wire shape.

use serde_json::{json, Value};

use crate::types::{CREATE_TASK_TOOL, SET_TASK_STATUS_TOOL};

/// A backend-neutral tool definition.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// The full tool surface: desktop-automation tools plus the two control tools.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "computer_screenshot",
            description: "Capture a screenshot of the current desktop",
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSpec {
            name: "computer_move_mouse",
            description: "Move the mouse cursor to absolute screen coordinates",
            parameters: json!({
                "type": "object",
                "properties": {
                    "x": {"type": "integer", "description": "Horizontal coordinate in pixels"},
                    "y": {"type": "integer", "description": "Vertical coordinate in pixels"}
                },
                "required": ["x", "y"]
            }),
        },
        ToolSpec {
            name: "computer_click_mouse",
            description: "Click a mouse button at the given coordinates",
            parameters: json!({
                "type": "object",
                "properties": {
                    "x": {"type": "integer"},
                    "y": {"type": "integer"},
                    "button": {"type": "string", "enum": ["left", "middle", "right"]},
                    "click_count": {"type": "integer", "minimum": 1}
                },
                "required": ["x", "y", "button"]
            }),
        },
        ToolSpec {
            name: "computer_type_text",
            description: "Type a string of text at the current focus",
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string"}
                },
                "required": ["text"]
            }),
        },
        ToolSpec {
            name: "computer_press_keys",
            description: "Press one or more keys, optionally as a chord",
            parameters: json!({
                "type": "object",
                "properties": {
                    "keys": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["keys"]
            }),
        },
        ToolSpec {
            name: "computer_scroll",
            description: "Scroll at the given coordinates",
            parameters: json!({
                "type": "object",
                "properties": {
                    "x": {"type": "integer"},
                    "y": {"type": "integer"},
                    "direction": {"type": "string", "enum": ["up", "down", "left", "right"]},
                    "amount": {"type": "integer", "minimum": 1}
                },
                "required": ["x", "y", "direction", "amount"]
            }),
        },
        ToolSpec {
            name: "computer_wait",
            description: "Pause before the next action",
            parameters: json!({
                "type": "object",
                "properties": {
                    "duration_ms": {"type": "integer", "minimum": 0}
                },
                "required": ["duration_ms"]
            }),
        },
        ToolSpec {
            name: "computer_application",
            description: "Open or focus a desktop application",
            parameters: json!({
                "type": "object",
                "properties": {
                    "application": {"type": "string"}
                },
                "required": ["application"]
            }),
        },
        ToolSpec {
            name: SET_TASK_STATUS_TOOL,
            description: "Report the final outcome of the current task",
            parameters: json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["completed", "needs_help", "failed"]},
                    "description": {"type": "string", "description": "Short explanation of the outcome"}
                },
                "required": ["status", "description"]
            }),
        },
        ToolSpec {
            name: CREATE_TASK_TOOL,
            description: "Create a follow-up task to be run separately",
            parameters: json!({
                "type": "object",
                "properties": {
                    "description": {"type": "string"},
                    "type": {"type": "string", "enum": ["immediate", "scheduled"]},
                    "priority": {"type": "string", "enum": ["low", "medium", "high", "urgent"]},
                    "scheduledFor": {"type": "string", "description": "RFC 3339 timestamp for scheduled tasks"}
                },
                "required": ["description"]
            }),
        },
    ]
}

/// Tool schemas in Anthropic format.
pub fn anthropic_tools() -> Vec<Value> {
    tool_specs()
        .into_iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "input_schema": spec.parameters,
            })
        })
        .collect()
}

/// Tool schemas in OpenAI function format.
pub fn openai_tools() -> Vec<Value> {
    tool_specs()
        .into_iter()
        .map(|spec| {
            json!({
                "type": "function",
                "function": {
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.parameters,
                }
            })
        })
        .collect()
}

/// Tool schemas as Google function declarations.
pub fn google_function_declarations() -> Vec<Value> {
    tool_specs()
        .into_iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "parameters": spec.parameters,
            })
        })
        .collect()
}
