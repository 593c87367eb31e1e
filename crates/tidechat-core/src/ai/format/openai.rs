//! OpenAI API format handler
//!
//! Handles conversion to the chat/completions format used by Mistral and
//! DeepSeek. These integrations have no native multimodal input, so any
//! attachment is accepted but not forwarded.

use serde_json::Value;

use super::{FormatHandler, RequestOptions};
use crate::ai::types::{Attachment, ConversationTurn, Role};

/// OpenAI chat/completions format handler
pub struct OpenAIFormat;

impl OpenAIFormat {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OpenAIFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatHandler for OpenAIFormat {
    /// Convert conversation turns to OpenAI message objects
    ///
    /// Attachments are dropped silently - text content only.
    fn convert_messages(
        &self,
        turns: &[ConversationTurn],
        _attachment: Option<&Attachment>,
    ) -> Vec<Value> {
        turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                serde_json::json!({
                    "role": role,
                    "content": turn.content,
                })
            })
            .collect()
    }

    fn build_request_body(
        &self,
        model: &str,
        messages: Vec<Value>,
        options: &RequestOptions,
    ) -> Value {
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        // System message goes at the front of the message list
        if let Some(system) = options.system_prompt {
            if let Some(msgs) = body.get_mut("messages").and_then(|m| m.as_array_mut()) {
                msgs.insert(
                    0,
                    serde_json::json!({
                        "role": "system",
                        "content": system,
                    }),
                );
            }
        }

        if options.streaming {
            body["stream"] = serde_json::json!(true);
        }

        if let Some(temp) = options.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }
}
