//! Google/Gemini API format handler
//!
//! Handles conversion to the Google AI API format (contents, parts,
//! systemInstruction). This is the only integration that forwards
//! attachments: the final user turn becomes a structured part list with the
//! file embedded as an inline data URI.

use serde_json::Value;

use super::{FormatHandler, RequestOptions};
use crate::ai::types::{Attachment, ConversationTurn, Role};

/// Text used when a file arrives on an empty final turn
const DEFAULT_FILE_PROMPT: &str = "What can you tell me about this file?";

/// Google format handler
pub struct GoogleFormat;

impl GoogleFormat {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoogleFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatHandler for GoogleFormat {
    /// Convert conversation turns to Google contents
    ///
    /// History prior to the final turn is role + text only; the attachment,
    /// when present, is embedded on the final turn as a data URI part.
    fn convert_messages(
        &self,
        turns: &[ConversationTurn],
        attachment: Option<&Attachment>,
    ) -> Vec<Value> {
        let mut contents: Vec<Value> = Vec::with_capacity(turns.len());

        for (i, turn) in turns.iter().enumerate() {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "model",
            };

            let is_last = i + 1 == turns.len();
            let parts = match attachment {
                Some(file) if is_last => {
                    let text = if turn.content.is_empty() {
                        DEFAULT_FILE_PROMPT
                    } else {
                        &turn.content
                    };
                    serde_json::json!([
                        {"text": text},
                        {
                            "inline_data": {
                                "mime_type": file.mime_type,
                                "data": file.base64,
                            }
                        }
                    ])
                }
                _ => serde_json::json!([{"text": turn.content}]),
            };

            contents.push(serde_json::json!({
                "role": role,
                "parts": parts,
            }));
        }

        contents
    }

    fn build_request_body(
        &self,
        _model: &str,
        messages: Vec<Value>,
        options: &RequestOptions,
    ) -> Value {
        let mut body = serde_json::json!({
            "contents": messages,
        });

        if let Some(system) = options.system_prompt {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{"text": system}]
            });
        }

        let mut generation_config = serde_json::Map::new();
        if let Some(temp) = options.temperature {
            generation_config.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = options.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), serde_json::json!(max_tokens));
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }

        body
    }
}
