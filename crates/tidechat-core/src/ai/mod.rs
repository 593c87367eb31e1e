//! AI provider layer
//!
//! Handles communication with the upstream LLM providers (Gemini, Mistral,
//! DeepSeek). Supports two API formats: OpenAI chat/completions and Google
//! generateContent.

pub mod client;
pub mod consumer;
pub mod error;
pub mod format;
pub mod gateway;
pub mod parsers;
pub mod providers;
pub mod sse;
pub mod title;
pub mod types;

pub use client::ProviderClient;
pub use error::{classify, ErrorKind, ProviderError};
pub use gateway::{CompletionGateway, ASSISTANT_SYSTEM_PROMPT};
pub use providers::ProviderId;
pub use title::TitleService;
