//! Google Gemini SSE parser for streaming responses
//!
//! Parses the Google AI streaming response format:
//! ```json
//! {"candidates": [{"content": {"parts": [{"text": "..."}], "role": "model"}, "finishReason": "STOP"}]}
//! ```

use serde_json::Value;

use crate::ai::sse::{SseEvent, SseParser};

/// Google Gemini SSE parser
pub struct GoogleParser;

impl SseParser for GoogleParser {
    fn parse_event(&self, json: &Value) -> SseEvent {
        let candidate = match json
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
        {
            Some(candidate) => candidate,
            None => return SseEvent::Skip,
        };

        // A chunk can carry both text and a finish reason; text wins so the
        // final fragment is not dropped. The stream ends on close anyway.
        if let Some(parts) = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
        {
            let text: String = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect();
            if !text.is_empty() {
                return SseEvent::TextDelta(text);
            }
        }

        if candidate.get("finishReason").and_then(|f| f.as_str()).is_some() {
            return SseEvent::Finish;
        }

        SseEvent::Skip
    }
}
