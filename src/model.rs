//! The model-invocation boundary.
//!
//! Bedrock hosts both the old text-completion models and the newer
//! chat-message models; the request envelope and the location of the reply
//! text differ between the two, so `ModelFamily` picks the right shape from
//! the configured model identifier. The reply text itself is treated as
//! opaque: whatever the model produced is handed back verbatim.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::{error::DisplayErrorContext, primitives::Blob, Client};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    /// The caller sent something we couldn't work with; maps to a 400 with
    /// the parse/key error text.
    #[error("{0}")]
    BadRequest(String),
    /// The model invocation failed or returned an envelope we couldn't read;
    /// maps to a 500 carrying the failure message.
    #[error("{0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    TextCompletion,
    ChatMessages,
}

impl ModelFamily {
    /// Only the legacy completion models still use the Human/Assistant
    /// prompt format; every newer identifier (including inference profiles)
    /// speaks the messages API.
    pub fn for_model_id(model_id: &str) -> Self {
        if model_id.contains("claude-v2") || model_id.contains("claude-instant") {
            ModelFamily::TextCompletion
        } else {
            ModelFamily::ChatMessages
        }
    }

    /// Build the invocation envelope for one user turn, with an optional
    /// system instruction.
    pub fn request_envelope(&self, system: Option<&str>, task: &str, max_tokens: u32) -> Value {
        match self {
            ModelFamily::TextCompletion => {
                // Completion models have no separate system slot; the
                // instruction is folded into the human turn.
                let prompt = match system {
                    Some(system) => format!("\n\nHuman: {system}\n\n{task}\n\nAssistant:"),
                    None => format!("\n\nHuman: {task}\n\nAssistant:"),
                };
                json!({ "prompt": prompt, "max_tokens_to_sample": max_tokens })
            }
            ModelFamily::ChatMessages => {
                let mut envelope = json!({
                    "anthropic_version": "bedrock-2023-05-31",
                    "max_tokens": max_tokens,
                    "messages": [
                        { "role": "user", "content": [{ "type": "text", "text": task }] }
                    ],
                });
                if let Some(system) = system {
                    envelope["system"] = Value::String(system.to_owned());
                }
                envelope
            }
        }
    }

    /// Pull the generated text out of a reply envelope.
    pub fn completion_text(&self, reply: &Value) -> Result<String, InferenceError> {
        let text = match self {
            ModelFamily::TextCompletion => reply.get("completion").and_then(Value::as_str),
            ModelFamily::ChatMessages => reply.pointer("/content/0/text").and_then(Value::as_str),
        };

        text.map(str::to_owned).ok_or_else(|| {
            InferenceError::Upstream("model reply did not contain completion text".into())
        })
    }
}

/// The single outbound operation of the inference gateway: invoke the model
/// synchronously and hand back its parsed reply envelope.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, model_id: &str, envelope: &Value) -> Result<Value, InferenceError>;
}

pub struct BedrockModel {
    client: Client,
}

impl BedrockModel {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        BedrockModel {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl ModelClient for BedrockModel {
    async fn invoke(&self, model_id: &str, envelope: &Value) -> Result<Value, InferenceError> {
        let body =
            serde_json::to_vec(envelope).map_err(|e| InferenceError::Upstream(e.to_string()))?;

        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| InferenceError::Upstream(DisplayErrorContext(&e).to_string()))?;

        serde_json::from_slice(response.body().as_ref())
            .map_err(|e| InferenceError::Upstream(format!("unparseable model reply: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_follows_the_model_identifier() {
        assert_eq!(
            ModelFamily::for_model_id("anthropic.claude-v2:1"),
            ModelFamily::TextCompletion
        );
        assert_eq!(
            ModelFamily::for_model_id("anthropic.claude-instant-v1"),
            ModelFamily::TextCompletion
        );
        assert_eq!(
            ModelFamily::for_model_id("anthropic.claude-3-5-sonnet-20240620-v1:0"),
            ModelFamily::ChatMessages
        );
        assert_eq!(
            ModelFamily::for_model_id("us.anthropic.claude-3-haiku-20240307-v1:0"),
            ModelFamily::ChatMessages
        );
    }

    #[test]
    fn completion_envelope_wraps_the_prompt() {
        let env = ModelFamily::TextCompletion.request_envelope(None, "say hi", 300);
        assert_eq!(env["prompt"], "\n\nHuman: say hi\n\nAssistant:");
        assert_eq!(env["max_tokens_to_sample"], 300);

        let env = ModelFamily::TextCompletion.request_envelope(Some("be terse"), "say hi", 300);
        assert_eq!(env["prompt"], "\n\nHuman: be terse\n\nsay hi\n\nAssistant:");
    }

    #[test]
    fn chat_envelope_carries_system_and_messages() {
        let env = ModelFamily::ChatMessages.request_envelope(Some("be terse"), "say hi", 2048);
        assert_eq!(env["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(env["max_tokens"], 2048);
        assert_eq!(env["system"], "be terse");
        assert_eq!(env["messages"][0]["role"], "user");
        assert_eq!(env["messages"][0]["content"][0]["text"], "say hi");

        let env = ModelFamily::ChatMessages.request_envelope(None, "say hi", 300);
        assert!(env.get("system").is_none());
    }

    #[test]
    fn reply_text_is_read_per_family() {
        let text = ModelFamily::TextCompletion
            .completion_text(&json!({ "completion": "hello" }))
            .unwrap();
        assert_eq!(text, "hello");

        let text = ModelFamily::ChatMessages
            .completion_text(&json!({ "content": [{ "type": "text", "text": "hello" }] }))
            .unwrap();
        assert_eq!(text, "hello");

        assert!(ModelFamily::TextCompletion
            .completion_text(&json!({ "content": "wrong family" }))
            .is_err());
        assert!(ModelFamily::ChatMessages
            .completion_text(&json!({ "content": [] }))
            .is_err());
    }
}
