//! Model descriptor coercion.
//!
//! The persisted `model` field on a task is opaque: it may be a full
//! descriptor object, a partial object, a bare model-name string, or garbage.
//! [`resolve_model`] is total: every input coerces to a descriptor with a
//! known provider tag.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fallback model when the persisted value carries no usable name.
pub const DEFAULT_MODEL_NAME: &str = "gpt-4.1-mini";

/// Provider tag.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    Openai,
    Google,
    Proxy,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Provider::Anthropic => "anthropic",
            Provider::Openai => "openai",
            Provider::Google => "google",
            Provider::Proxy => "proxy",
        };
        f.write_str(tag)
    }
}

/// Canonical record describing the LLM to call. Derived, never persisted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub provider: Provider,
    pub name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
}

/// Coerce a persisted model value of unknown shape into a descriptor.
pub fn resolve_model(value: &serde_json::Value) -> ModelDescriptor {
    if let Some(object) = value.as_object() {
        let name = object.get("name").and_then(|v| v.as_str());
        let provider = object.get("provider").and_then(|v| v.as_str());

        if let Some(name) = name {
            let provider = provider
                .and_then(parse_provider)
                .unwrap_or_else(|| infer_provider(name));
            let title = object
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or(name);
            let context_window = object.get("contextWindow").and_then(|v| v.as_u64());
            return ModelDescriptor {
                provider,
                name: name.to_string(),
                title: title.to_string(),
                context_window,
            };
        }
    }

    if let Some(name) = value.as_str() {
        return ModelDescriptor {
            provider: infer_provider(name),
            name: name.to_string(),
            title: name.to_string(),
            context_window: None,
        };
    }

    ModelDescriptor {
        provider: Provider::Openai,
        name: DEFAULT_MODEL_NAME.to_string(),
        title: DEFAULT_MODEL_NAME.to_string(),
        context_window: None,
    }
}

fn parse_provider(tag: &str) -> Option<Provider> {
    match tag {
        "anthropic" => Some(Provider::Anthropic),
        "openai" => Some(Provider::Openai),
        "google" => Some(Provider::Google),
        "proxy" => Some(Provider::Proxy),
        _ => None,
    }
}

fn infer_provider(name: &str) -> Provider {
    if name.starts_with("claude") {
        Provider::Anthropic
    } else if name.starts_with("gemini") {
        Provider::Google
    } else if name.starts_with("gpt-") || name.contains("openai") {
        Provider::Openai
    } else {
        Provider::Proxy
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_object_used_as_is() {
        let descriptor = resolve_model(&json!({
            "provider": "anthropic",
            "name": "claude-sonnet-4",
            "title": "Claude Sonnet 4",
            "contextWindow": 200000
        }));
        assert_eq!(descriptor.provider, Provider::Anthropic);
        assert_eq!(descriptor.name, "claude-sonnet-4");
        assert_eq!(descriptor.title, "Claude Sonnet 4");
        assert_eq!(descriptor.context_window, Some(200000));
    }

    #[test]
    fn test_object_without_title_defaults_to_name() {
        let descriptor = resolve_model(&json!({
            "provider": "openai",
            "name": "gpt-4.1"
        }));
        assert_eq!(descriptor.title, "gpt-4.1");
        assert_eq!(descriptor.context_window, None);
    }

    #[test]
    fn test_object_with_name_only_infers_provider() {
        let descriptor = resolve_model(&json!({"name": "gemini-2.5-pro"}));
        assert_eq!(descriptor.provider, Provider::Google);
        assert_eq!(descriptor.name, "gemini-2.5-pro");
        assert_eq!(descriptor.title, "gemini-2.5-pro");
    }

    #[test]
    fn test_unknown_provider_tag_falls_back_to_inference() {
        let descriptor = resolve_model(&json!({
            "provider": "acme",
            "name": "claude-3-sonnet"
        }));
        assert_eq!(descriptor.provider, Provider::Anthropic);
    }

    #[test]
    fn test_bare_string_infers_anthropic() {
        let descriptor = resolve_model(&json!("claude-3-sonnet"));
        assert_eq!(descriptor.provider, Provider::Anthropic);
        assert_eq!(descriptor.name, "claude-3-sonnet");
        assert_eq!(descriptor.title, "claude-3-sonnet");
    }

    #[test]
    fn test_bare_string_infers_openai_by_prefix() {
        assert_eq!(resolve_model(&json!("gpt-4.1")).provider, Provider::Openai);
        assert_eq!(
            resolve_model(&json!("azure-openai-gpt4")).provider,
            Provider::Openai
        );
    }

    #[test]
    fn test_unrecognized_name_routes_to_proxy() {
        assert_eq!(
            resolve_model(&json!("llama-3.1-70b")).provider,
            Provider::Proxy
        );
    }

    #[test]
    fn test_malformed_values_default() {
        for value in [json!(42), json!(null), json!([1, 2]), json!({"foo": "bar"})] {
            let descriptor = resolve_model(&value);
            assert_eq!(descriptor.provider, Provider::Openai);
            assert_eq!(descriptor.name, DEFAULT_MODEL_NAME);
            assert_eq!(descriptor.title, DEFAULT_MODEL_NAME);
        }
    }

    #[test]
    fn test_non_numeric_context_window_dropped() {
        let descriptor = resolve_model(&json!({
            "provider": "openai",
            "name": "gpt-4.1",
            "contextWindow": "lots"
        }));
        assert_eq!(descriptor.context_window, None);
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(Provider::Anthropic.to_string(), "anthropic");
        assert_eq!(Provider::Proxy.to_string(), "proxy");
    }
}
