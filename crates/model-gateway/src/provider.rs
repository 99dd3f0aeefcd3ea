use serde_json::{json, Value};

use crate::{GatewayError, Result};

/// One wire convention for reaching a model endpoint.
pub trait Provider: Send + Sync {
    /// Identifier as written in configuration.
    fn id(&self) -> &str;

    /// Request body for a single, non-streaming completion.
    fn build_body(&self, model: &str, prompt: &str) -> Value;

    /// Completion text from a decoded response payload. Any unexpected
    /// shape yields an empty string; the validator rejects it downstream.
    fn extract_text(&self, payload: &Value) -> String;
}

/// `{model, prompt, stream: false}` → `response`.
#[derive(Debug, Clone, Default)]
pub struct PromptProvider;

impl Provider for PromptProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn build_body(&self, model: &str, prompt: &str) -> Value {
        json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        })
    }

    fn extract_text(&self, payload: &Value) -> String {
        payload
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

/// `{model, messages: [{role: user, content}]}` → `choices[0].message.content`.
#[derive(Debug, Clone)]
pub struct ChatProvider {
    id: String,
}

impl ChatProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Provider for ChatProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn build_body(&self, model: &str, prompt: &str) -> Value {
        json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0,
        })
    }

    fn extract_text(&self, payload: &Value) -> String {
        payload
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

/// Select the adapter for a configured provider id.
pub fn provider_for(id: &str) -> Result<Box<dyn Provider>> {
    match id {
        "ollama" => Ok(Box::new(PromptProvider)),
        "openai" | "openai-compatible" => Ok(Box::new(ChatProvider::new(id))),
        other => Err(GatewayError::UnsupportedProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_body_disables_streaming() {
        let body = PromptProvider.build_body("m1", "hello");
        assert_eq!(body["model"], "m1");
        assert_eq!(body["prompt"], "hello");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn chat_body_has_single_user_message() {
        let body = ChatProvider::new("openai").build_body("gpt", "hi");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "hi");
    }

    #[test]
    fn chat_extract_missing_choices_is_empty() {
        let provider = ChatProvider::new("openai");
        assert_eq!(provider.extract_text(&json!({})), "");
        assert_eq!(provider.extract_text(&json!({"choices": []})), "");
        assert_eq!(
            provider.extract_text(&json!({"choices": [{"message": {"content": "x"}}]})),
            "x"
        );
    }

    #[test]
    fn prompt_extract_non_string_is_empty() {
        assert_eq!(PromptProvider.extract_text(&json!({"response": 3})), "");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = provider_for("bedrock").err().unwrap();
        assert_eq!(err.to_string(), "unsupported_provider:bedrock");
    }

    #[test]
    fn known_providers_resolve() {
        assert_eq!(provider_for("ollama").unwrap().id(), "ollama");
        assert_eq!(provider_for("openai").unwrap().id(), "openai");
        assert_eq!(
            provider_for("openai-compatible").unwrap().id(),
            "openai-compatible"
        );
    }
}
