//! OpenAI-compatible SSE parser for streaming responses
//!
//! Used by Mistral and DeepSeek. Chunks look like:
//! ```json
//! {"choices": [{"delta": {"content": "..."}, "finish_reason": null}]}
//! ```
//! terminated by a literal `[DONE]` marker handled upstream.

use serde_json::Value;

use crate::ai::sse::{SseEvent, SseParser};

/// OpenAI chat/completions SSE parser
pub struct OpenAIParser;

impl SseParser for OpenAIParser {
    fn parse_event(&self, json: &Value) -> SseEvent {
        let choice = match json.get("choices").and_then(|c| c.as_array()).and_then(|arr| arr.first()) {
            Some(choice) => choice,
            None => return SseEvent::Skip,
        };

        if let Some(content) = choice
            .get("delta")
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
        {
            if !content.is_empty() {
                return SseEvent::TextDelta(content.to_string());
            }
        }

        if choice.get("finish_reason").and_then(|f| f.as_str()).is_some() {
            return SseEvent::Finish;
        }

        SseEvent::Skip
    }
}
