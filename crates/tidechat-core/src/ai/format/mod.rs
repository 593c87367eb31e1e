//! API format handling
//!
//! Abstracts the differences between the OpenAI chat/completions and Google
//! generateContent request shapes. Each format handler knows how to convert a
//! conversation and build a complete request body.

pub mod google;
pub mod openai;

use serde_json::Value;

use super::providers::ApiFormat;
use super::types::{Attachment, ConversationTurn};

/// Trait for handling different API formats
///
/// Implementations convert between our unified conversation turns and the
/// provider-specific request payloads. History prior to the final turn is
/// translated role + text only; the attachment, when one is given and the
/// format supports it, lands on the final user turn.
pub trait FormatHandler: Send + Sync {
    /// Convert conversation turns to API-specific message objects
    fn convert_messages(
        &self,
        turns: &[ConversationTurn],
        attachment: Option<&Attachment>,
    ) -> Vec<Value>;

    /// Build the complete request body
    fn build_request_body(
        &self,
        model: &str,
        messages: Vec<Value>,
        options: &RequestOptions,
    ) -> Value;
}

/// Options for building API requests
pub struct RequestOptions<'a> {
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<&'a str>,
    pub temperature: Option<f64>,
    pub streaming: bool,
}

impl<'a> Default for RequestOptions<'a> {
    fn default() -> Self {
        Self {
            max_tokens: None,
            system_prompt: None,
            temperature: None,
            streaming: false,
        }
    }
}

/// Select the appropriate format handler based on API format
pub fn get_format_handler(format: ApiFormat) -> Box<dyn FormatHandler> {
    match format {
        ApiFormat::OpenAI => Box::new(openai::OpenAIFormat::new()),
        ApiFormat::Google => Box::new(google::GoogleFormat::new()),
    }
}
