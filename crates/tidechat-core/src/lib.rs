//! Tidechat Core - Shared library for the chat gateway and storage
//!
//! This crate provides the core functionality for the Tidechat server:
//! - Multi-provider streaming completion gateway with quota/balance fallback
//! - Title summarization with a provider chain and deterministic fallback
//! - Client-side stream consumer and error classification
//! - Chat, message, and preference storage

pub mod ai;
pub mod constants;
pub mod storage;

// Re-exports for convenience
pub use ai::client::ProviderClient;
pub use ai::error::{classify, ErrorKind, ProviderError};
pub use ai::gateway::{CompletionGateway, ASSISTANT_SYSTEM_PROMPT};
pub use ai::providers::ProviderId;
pub use ai::title::TitleService;
pub use ai::types::{Attachment, ChatRequest, ConversationTurn, Role};
pub use storage::{ChatStore, Database, MessageStore, Preferences};
