//! Provider-specific SSE parsers

pub mod google;
pub mod openai;

pub use google::GoogleParser;
pub use openai::OpenAIParser;

use super::providers::ApiFormat;
use super::sse::SseParser;

/// Select the appropriate parser based on API format
pub fn get_parser(format: ApiFormat) -> Box<dyn SseParser> {
    match format {
        ApiFormat::OpenAI => Box::new(OpenAIParser),
        ApiFormat::Google => Box::new(GoogleParser),
    }
}
