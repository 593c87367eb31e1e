//! AI provider configuration
//!
//! Defines provider identifiers, configurations, and the built-in provider
//! registry for the completion and title gateways.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Wire format spoken by a provider endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiFormat {
    /// OpenAI-compatible `chat/completions` with SSE `data:` lines
    OpenAI,
    /// Google `generateContent` / `streamGenerateContent`
    Google,
}

/// How to send the API key in requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthHeader {
    /// Use `Authorization: Bearer <key>` (OpenAI style)
    #[default]
    Bearer,
    /// Use `x-goog-api-key: <key>` (Google style)
    GoogleApiKey,
}

/// Unique identifier for each supported provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Default conversational provider
    #[default]
    Gemini,
    /// Secondary conversational provider, selectable by the client
    Mistral,
    /// Title-generation fallback only, never serves chat completions
    Deepseek,
}

impl ProviderId {
    /// Environment variable holding this provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "GOOGLE_API_KEY",
            ProviderId::Mistral => "MISTRAL_AI_API_KEY",
            ProviderId::Deepseek => "DEEPSEEK_API_KEY",
        }
    }

    /// The single fallback hop for a chat completion, if any
    ///
    /// Quota exhaustion on the default provider falls back to Mistral;
    /// balance exhaustion on Mistral falls back to the default provider.
    /// DeepSeek never serves chat completions.
    pub fn completion_fallback(&self) -> Option<ProviderId> {
        match self {
            ProviderId::Gemini => Some(ProviderId::Mistral),
            ProviderId::Mistral => Some(ProviderId::Gemini),
            ProviderId::Deepseek => None,
        }
    }

    /// Preference order for title generation
    pub fn title_chain() -> &'static [ProviderId] {
        &[ProviderId::Gemini, ProviderId::Deepseek, ProviderId::Mistral]
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::Gemini => write!(f, "Gemini"),
            ProviderId::Mistral => write!(f, "Mistral"),
            ProviderId::Deepseek => write!(f, "DeepSeek"),
        }
    }
}

/// Configuration for an AI provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Unique identifier
    pub id: ProviderId,
    /// Display name
    pub name: &'static str,
    /// Endpoint URL for non-streaming calls
    pub base_url: &'static str,
    /// Endpoint URL for streaming calls
    pub stream_url: &'static str,
    /// Model ID to send in API requests
    pub model: &'static str,
    /// Wire format for requests and streamed responses
    pub api_format: ApiFormat,
    /// How to send authentication
    pub auth_header: AuthHeader,
    /// Whether attachments are forwarded to this provider
    pub supports_attachments: bool,
}

/// Lazily initialized built-in provider configurations
static BUILTIN_PROVIDERS: LazyLock<Vec<ProviderConfig>> = LazyLock::new(|| {
    vec![
        ProviderConfig {
            id: ProviderId::Gemini,
            name: "Google Gemini",
            base_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent",
            stream_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:streamGenerateContent?alt=sse",
            model: "gemini-2.5-flash-lite",
            api_format: ApiFormat::Google,
            auth_header: AuthHeader::GoogleApiKey,
            supports_attachments: true,
        },
        ProviderConfig {
            id: ProviderId::Mistral,
            name: "Mistral AI",
            base_url: "https://api.mistral.ai/v1/chat/completions",
            stream_url: "https://api.mistral.ai/v1/chat/completions",
            model: "mistral-large-latest",
            api_format: ApiFormat::OpenAI,
            auth_header: AuthHeader::Bearer,
            supports_attachments: false,
        },
        ProviderConfig {
            id: ProviderId::Deepseek,
            name: "DeepSeek",
            base_url: "https://api.deepseek.com/v1/chat/completions",
            stream_url: "https://api.deepseek.com/v1/chat/completions",
            model: "deepseek-chat",
            api_format: ApiFormat::OpenAI,
            auth_header: AuthHeader::Bearer,
            supports_attachments: false,
        },
    ]
});

/// Get all built-in provider configurations (cached, no allocation)
pub fn builtin_providers() -> &'static [ProviderConfig] {
    &BUILTIN_PROVIDERS
}

/// Get a specific provider configuration by ID
pub fn get_provider(id: ProviderId) -> &'static ProviderConfig {
    BUILTIN_PROVIDERS
        .iter()
        .find(|p| p.id == id)
        .expect("all ProviderId variants are registered")
}
