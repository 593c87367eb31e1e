//! Provider HTTP client
//!
//! Handles the actual upstream calls for both streaming completions and
//! one-shot text generation. Connection and auth failures surface before the
//! first streamed byte, so callers can still change their minds about which
//! provider serves the request.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::error::{parse_retry_after, ProviderError};
use super::format::{get_format_handler, RequestOptions};
use super::parsers::get_parser;
use super::providers::{get_provider, ApiFormat, AuthHeader, ProviderConfig, ProviderId};
use super::sse::{SseStreamProcessor, StreamProgress};
use super::types::{Attachment, ConversationTurn};
use crate::constants;

/// Everything needed to issue one upstream completion call
pub struct CompletionRequest<'a> {
    pub turns: &'a [ConversationTurn],
    pub attachment: Option<&'a Attachment>,
    pub system_prompt: &'a str,
    pub temperature: Option<f64>,
}

/// Seam between the dispatch state machine and the network
///
/// The gateway and title service only see this trait, which keeps the
/// fallback logic testable against mock providers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Open a live token stream against one provider
    ///
    /// Returns the receiving end of the fragment channel once the upstream
    /// response headers have been accepted; any quota/auth/network failure
    /// is reported here, before streaming begins.
    async fn open_stream(
        &self,
        provider: ProviderId,
        request: CompletionRequest<'_>,
    ) -> Result<mpsc::UnboundedReceiver<String>, ProviderError>;

    /// One-shot non-streaming call, used for title generation
    async fn complete(
        &self,
        provider: ProviderId,
        system_prompt: &str,
        user_message: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;

    /// Whether credentials for this provider are configured
    fn is_configured(&self, provider: ProviderId) -> bool;
}

/// Provider API client backed by reqwest
pub struct ProviderClient {
    http: Client,
    api_keys: HashMap<ProviderId, String>,
}

impl ProviderClient {
    /// Create the HTTP client with configuration suited to SSE streaming
    fn create_http_client() -> Client {
        Client::builder()
            .user_agent("Tidechat/0.1")
            .connect_timeout(constants::http::CONNECT_TIMEOUT)
            .timeout(constants::http::STREAM_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build HTTP client: {}. Using default client.", e);
                Client::new()
            })
    }

    /// Create a client with explicit per-provider API keys
    pub fn new(api_keys: HashMap<ProviderId, String>) -> Self {
        Self {
            http: Self::create_http_client(),
            api_keys,
        }
    }

    /// Create a client from the environment
    ///
    /// Missing keys are not an error here; the provider is simply reported
    /// as unconfigured and fails at call time with a descriptive message.
    pub fn from_env() -> Self {
        let mut api_keys = HashMap::new();
        for provider in super::providers::builtin_providers() {
            if let Ok(key) = std::env::var(provider.id.api_key_env()) {
                if !key.is_empty() {
                    api_keys.insert(provider.id, key);
                }
            }
        }
        info!(
            "Provider credentials configured: {:?}",
            api_keys.keys().collect::<Vec<_>>()
        );
        Self::new(api_keys)
    }

    fn api_key(&self, provider: ProviderId) -> Result<&str, ProviderError> {
        self.api_keys
            .get(&provider)
            .map(|k| k.as_str())
            .ok_or_else(|| {
                ProviderError::new(
                    provider,
                    None,
                    format!("{} is not configured", provider.api_key_env()),
                )
            })
    }

    /// Build a POST request with the provider's authentication scheme
    fn build_request(&self, url: &str, config: &ProviderConfig, api_key: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(url);
        match config.auth_header {
            AuthHeader::Bearer => request.header("authorization", format!("Bearer {api_key}")),
            AuthHeader::GoogleApiKey => request.header("x-goog-api-key", api_key),
        }
    }

    /// Turn a non-success response into a classified ProviderError
    async fn error_from_response(
        provider: ProviderId,
        response: reqwest::Response,
    ) -> ProviderError {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(provider, status, &body);
        error!("{} API error: {} - {}", provider, status, message);

        ProviderError::new(provider, Some(status), message).with_retry_after(retry_after)
    }
}

/// Pull the human-readable message out of an upstream error body
///
/// Providers disagree on the envelope: `{"error": {"message": ...}}`,
/// `{"message": ...}`, or plain text.
fn extract_error_message(provider: ProviderId, status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    format!("{provider} API error: HTTP {status}")
}

#[async_trait]
impl CompletionBackend for ProviderClient {
    async fn open_stream(
        &self,
        provider: ProviderId,
        request: CompletionRequest<'_>,
    ) -> Result<mpsc::UnboundedReceiver<String>, ProviderError> {
        let api_key = self.api_key(provider)?;
        let config = get_provider(provider);
        let handler = get_format_handler(config.api_format);

        let attachment = if config.supports_attachments {
            request.attachment
        } else {
            // Accepted in the payload but not forwarded
            None
        };

        let messages = handler.convert_messages(request.turns, attachment);
        let body = handler.build_request_body(
            config.model,
            messages,
            &RequestOptions {
                system_prompt: Some(request.system_prompt),
                temperature: request.temperature,
                streaming: true,
                ..Default::default()
            },
        );

        info!("Opening {} stream ({} turns)", provider, request.turns.len());
        let response = self
            .build_request(config.stream_url, config, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(provider, e.status().map(|s| s.as_u16()), e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(provider, response).await);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let api_format = config.api_format;
        tokio::spawn(async move {
            let parser = get_parser(api_format);
            let mut processor = SseStreamProcessor::new(tx);
            let mut upstream = response.bytes_stream();

            while let Some(chunk) = upstream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        // Mid-stream network failure: downstream sees
                        // ordinary stream-close with whatever arrived
                        error!("{} stream read failed: {}", provider, e);
                        break;
                    }
                };
                match processor.process_chunk(&bytes, parser.as_ref()) {
                    StreamProgress::Active => {}
                    StreamProgress::Finished => break,
                    StreamProgress::DownstreamClosed => {
                        // Client went away; dropping `upstream` closes the
                        // provider connection
                        debug!("{} relay stopped: downstream closed", provider);
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn complete(
        &self,
        provider: ProviderId,
        system_prompt: &str,
        user_message: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key(provider)?;
        let config = get_provider(provider);
        let handler = get_format_handler(config.api_format);

        let turns = [ConversationTurn::user(user_message)];
        let messages = handler.convert_messages(&turns, None);
        let body = handler.build_request_body(
            config.model,
            messages,
            &RequestOptions {
                system_prompt: Some(system_prompt),
                max_tokens: Some(max_tokens),
                temperature: Some(constants::ai::COMPLETION_TEMPERATURE),
                streaming: false,
            },
        );

        debug!("Simple {} call: {} chars in", provider, user_message.len());
        let response = self
            .build_request(config.base_url, config, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(provider, e.status().map(|s| s.as_u16()), e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(provider, response).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::new(provider, None, e.to_string()))?;

        Ok(extract_completion_text(config.api_format, &json))
    }

    fn is_configured(&self, provider: ProviderId) -> bool {
        self.api_keys.contains_key(&provider)
    }
}

/// Extract the text content from a non-streaming completion response
fn extract_completion_text(format: ApiFormat, json: &Value) -> String {
    match format {
        ApiFormat::OpenAI => json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string(),
        ApiFormat::Google => json
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_provider_message() {
        let client = ProviderClient::new(HashMap::new());
        let err = client.api_key(ProviderId::Mistral).unwrap_err();
        assert_eq!(err.message, "MISTRAL_AI_API_KEY is not configured");
        assert!(!client.is_configured(ProviderId::Mistral));
    }

    #[test]
    fn test_extract_error_message_nested() {
        let msg = extract_error_message(
            ProviderId::Mistral,
            429,
            r#"{"error": {"message": "quota exceeded"}}"#,
        );
        assert_eq!(msg, "quota exceeded");
    }

    #[test]
    fn test_extract_error_message_flat() {
        let msg = extract_error_message(ProviderId::Deepseek, 402, r#"{"message": "Insufficient Balance"}"#);
        assert_eq!(msg, "Insufficient Balance");
    }

    #[test]
    fn test_extract_error_message_plain_text() {
        let msg = extract_error_message(ProviderId::Gemini, 500, "upstream exploded");
        assert_eq!(msg, "upstream exploded");
    }

    #[test]
    fn test_extract_error_message_empty_body() {
        let msg = extract_error_message(ProviderId::Gemini, 503, "");
        assert_eq!(msg, "Gemini API error: HTTP 503");
    }

    #[test]
    fn test_extract_completion_text_openai() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  A title  "}}]
        });
        assert_eq!(extract_completion_text(ApiFormat::OpenAI, &json), "A title");
    }

    #[test]
    fn test_extract_completion_text_google() {
        let json = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Rust "}, {"text": "Basics"}]}}]
        });
        assert_eq!(extract_completion_text(ApiFormat::Google, &json), "Rust Basics");
    }

    #[test]
    fn test_extract_completion_text_missing() {
        assert_eq!(
            extract_completion_text(ApiFormat::OpenAI, &serde_json::json!({})),
            ""
        );
    }
}
