//! Conversation title generation
//!
//! Titles are best-effort: a chain of providers is tried in preference
//! order, and when all of them are exhausted or unavailable a deterministic
//! local title is computed instead. Callers never see an error from here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::client::CompletionBackend;
use super::providers::ProviderId;
use crate::constants;

/// System instruction for title generation calls
const TITLE_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates concise, descriptive titles for conversations. Respond with only the title, no additional text.";

/// How much of the assistant response is embedded in the prompt
const ASSISTANT_CONTEXT_CHARS: usize = 200;

/// Placeholder when there is nothing to derive a title from
pub const DEFAULT_TITLE: &str = "New Chat";

/// Generates short conversation titles with provider fallback
pub struct TitleService {
    backend: Arc<dyn CompletionBackend>,
}

impl TitleService {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Generate a title for a conversation opener
    ///
    /// Walks the provider chain, skipping unconfigured providers and moving
    /// on only when a failure is quota or balance classified. Any other
    /// failure ends the chain; the local fallback then applies.
    pub async fn generate(&self, user_message: &str, assistant_response: Option<&str>) -> String {
        let prompt = build_title_prompt(user_message, assistant_response);

        for &provider in ProviderId::title_chain() {
            if !self.backend.is_configured(provider) {
                debug!("Skipping {} for title generation: not configured", provider);
                continue;
            }

            match self
                .backend
                .complete(
                    provider,
                    TITLE_SYSTEM_PROMPT,
                    &prompt,
                    constants::ai::TITLE_MAX_TOKENS,
                )
                .await
            {
                Ok(raw) => {
                    let title = postprocess_title(&raw);
                    if let Some(title) = title {
                        info!("Title generated by {}: {:?}", provider, title);
                        return title;
                    }
                    // Empty response; treat like a terminal failure
                    warn!("{} returned an empty title", provider);
                    break;
                }
                Err(error) if error.is_quota() || error.is_balance() => {
                    info!(
                        "{} exhausted for title generation ({:?}), trying next",
                        provider, error.kind
                    );
                }
                Err(error) => {
                    warn!("{} title generation failed: {}", provider, error.message);
                    break;
                }
            }
        }

        fallback_title(user_message)
    }
}

/// Build the fixed instruction prompt embedding the conversation opener
fn build_title_prompt(user_message: &str, assistant_response: Option<&str>) -> String {
    let assistant_line = match assistant_response {
        Some(response) if !response.is_empty() => {
            format!("Assistant: {}", truncate_chars(response, ASSISTANT_CONTEXT_CHARS))
        }
        _ => String::new(),
    };
    format!(
        "Based on this conversation, generate a concise, descriptive title (maximum 50 characters) that captures the main topic or question being discussed.\n\nUser: {user_message}\n{assistant_line}\n\nGenerate only the title, nothing else. Make it clear and specific."
    )
}

/// Clean up a remote-generated title: strip quotes, enforce the length cap
///
/// Returns None when nothing usable remains.
fn postprocess_title(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_start_matches(['"', '\''])
        .trim_end_matches(['"', '\''])
        .trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(cap_length(trimmed))
}

/// Deterministic local title when no provider could be used
pub fn fallback_title(user_message: &str) -> String {
    let trimmed = user_message.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    cap_length(trimmed)
}

/// Heuristic title from a message alone, no network involved
///
/// Drops a leading question word and trailing question marks, then uses the
/// message (or its first sentence) directly when short enough.
pub fn title_from_message(message: &str) -> String {
    let mut cleaned = message.trim();
    if let Some((first_word, rest)) = cleaned.split_once(char::is_whitespace) {
        const QUESTION_WORDS: &[&str] = &[
            "what", "how", "why", "when", "where", "can", "could", "would", "should", "is",
            "are", "do", "does", "did",
        ];
        if QUESTION_WORDS.contains(&first_word.to_lowercase().as_str()) {
            cleaned = rest.trim_start();
        }
    }
    let cleaned = cleaned.trim_end_matches('?').trim();

    if cleaned.chars().count() <= constants::ai::TITLE_MAX_CHARS {
        return capitalize_first(cleaned);
    }

    let first_sentence = cleaned
        .split(['.', '!', '?'])
        .next()
        .unwrap_or(cleaned)
        .trim();
    if first_sentence.chars().count() <= constants::ai::TITLE_MAX_CHARS {
        return capitalize_first(first_sentence);
    }

    format!(
        "{}...",
        truncate_chars(cleaned, constants::ai::TITLE_TRUNCATE_AT).trim_end()
    )
}

/// Hard cap at the title limit, truncating to 47 chars plus ellipsis
fn cap_length(title: &str) -> String {
    if title.chars().count() > constants::ai::TITLE_MAX_CHARS {
        format!("{}...", truncate_chars(title, constants::ai::TITLE_TRUNCATE_AT))
    } else {
        title.to_string()
    }
}

/// Character-boundary-safe prefix
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::CompletionRequest;
    use crate::ai::error::ProviderError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct MockBackend {
        outcomes: HashMap<ProviderId, Result<String, (Option<u16>, String)>>,
        calls: Mutex<Vec<ProviderId>>,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                outcomes: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn succeeds(mut self, provider: ProviderId, title: &str) -> Self {
            self.outcomes.insert(provider, Ok(title.to_string()));
            self
        }

        fn fails(mut self, provider: ProviderId, status: Option<u16>, message: &str) -> Self {
            self.outcomes
                .insert(provider, Err((status, message.to_string())));
            self
        }

        fn calls(&self) -> Vec<ProviderId> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for MockBackend {
        async fn open_stream(
            &self,
            provider: ProviderId,
            _request: CompletionRequest<'_>,
        ) -> Result<mpsc::UnboundedReceiver<String>, ProviderError> {
            Err(ProviderError::new(provider, None, "not used"))
        }

        async fn complete(
            &self,
            provider: ProviderId,
            _system_prompt: &str,
            _user_message: &str,
            _max_tokens: u32,
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(provider);
            match self.outcomes.get(&provider) {
                Some(Ok(title)) => Ok(title.clone()),
                Some(Err((status, message))) => {
                    Err(ProviderError::new(provider, *status, message.clone()))
                }
                None => Err(ProviderError::new(provider, None, "no canned outcome")),
            }
        }

        fn is_configured(&self, provider: ProviderId) -> bool {
            self.outcomes.contains_key(&provider)
        }
    }

    fn service(backend: MockBackend) -> (TitleService, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (TitleService::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_first_provider_success() {
        let (service, backend) =
            service(MockBackend::new().succeeds(ProviderId::Gemini, "\"Rust Lifetimes\""));
        let title = service.generate("explain lifetimes", None).await;
        assert_eq!(title, "Rust Lifetimes");
        assert_eq!(backend.calls(), vec![ProviderId::Gemini]);
    }

    #[tokio::test]
    async fn test_quota_walks_to_next_provider() {
        let (service, backend) = service(
            MockBackend::new()
                .fails(ProviderId::Gemini, Some(429), "quota exceeded")
                .succeeds(ProviderId::Deepseek, "Sorting in Python"),
        );
        let title = service.generate("how do I sort?", None).await;
        assert_eq!(title, "Sorting in Python");
        assert_eq!(backend.calls(), vec![ProviderId::Gemini, ProviderId::Deepseek]);
    }

    #[tokio::test]
    async fn test_balance_walks_full_chain() {
        let (service, backend) = service(
            MockBackend::new()
                .fails(ProviderId::Gemini, Some(429), "quota exceeded")
                .fails(ProviderId::Deepseek, Some(402), "Insufficient Balance")
                .succeeds(ProviderId::Mistral, "Database Indexing"),
        );
        let title = service.generate("indexes?", None).await;
        assert_eq!(title, "Database Indexing");
        assert_eq!(
            backend.calls(),
            vec![ProviderId::Gemini, ProviderId::Deepseek, ProviderId::Mistral]
        );
    }

    #[tokio::test]
    async fn test_unclassified_failure_stops_chain() {
        let (service, backend) = service(
            MockBackend::new()
                .fails(ProviderId::Gemini, Some(401), "invalid api key")
                .succeeds(ProviderId::Deepseek, "never reached"),
        );
        let title = service.generate("short question", None).await;
        assert_eq!(title, "short question");
        assert_eq!(backend.calls(), vec![ProviderId::Gemini]);
    }

    #[tokio::test]
    async fn test_unconfigured_providers_skipped() {
        let (service, backend) =
            service(MockBackend::new().succeeds(ProviderId::Mistral, "Only Option"));
        let title = service.generate("hello", None).await;
        assert_eq!(title, "Only Option");
        assert_eq!(backend.calls(), vec![ProviderId::Mistral]);
    }

    #[tokio::test]
    async fn test_nothing_configured_uses_local_fallback() {
        let (service, _) = service(MockBackend::new());
        assert_eq!(service.generate("hello there", None).await, "hello there");
        assert_eq!(service.generate("", None).await, "New Chat");
        let long = "a".repeat(60);
        assert_eq!(service.generate(&long, None).await, format!("{}...", "a".repeat(47)));
    }

    #[tokio::test]
    async fn test_long_remote_title_capped() {
        let long_title = "x".repeat(60);
        let (service, _) = service(MockBackend::new().succeeds(ProviderId::Gemini, &long_title));
        let title = service.generate("whatever", None).await;
        assert_eq!(title, format!("{}...", "x".repeat(47)));
        assert_eq!(title.chars().count(), 50);
    }

    #[tokio::test]
    async fn test_empty_remote_title_falls_back() {
        let (service, _) = service(MockBackend::new().succeeds(ProviderId::Gemini, "  \"\"  "));
        assert_eq!(service.generate("my question", None).await, "my question");
    }

    #[test]
    fn test_prompt_embeds_truncated_assistant_response() {
        let long_response = "y".repeat(300);
        let prompt = build_title_prompt("q", Some(&long_response));
        assert!(prompt.contains(&format!("Assistant: {}", "y".repeat(200))));
        assert!(!prompt.contains(&"y".repeat(201)));
        assert!(prompt.contains("User: q"));

        let prompt = build_title_prompt("q", None);
        assert!(!prompt.contains("Assistant:"));
    }

    #[test]
    fn test_title_from_message_strips_question_word() {
        assert_eq!(
            title_from_message("How do I sort an array in Python?"),
            "Do I sort an array in Python"
        );
    }

    #[test]
    fn test_title_from_message_short_capitalized() {
        assert_eq!(title_from_message("rust borrow checker"), "Rust borrow checker");
    }

    #[test]
    fn test_title_from_message_first_sentence() {
        let message = format!("Explain traits. {}", "z".repeat(100));
        assert_eq!(title_from_message(&message), "Explain traits");
    }

    #[test]
    fn test_title_from_message_truncates() {
        let message = "w".repeat(80);
        let title = title_from_message(&message);
        assert_eq!(title, format!("{}...", "w".repeat(47)));
    }

    #[test]
    fn test_fallback_title_multibyte_boundary() {
        let message = "é".repeat(60);
        let title = fallback_title(&message);
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
    }
}
