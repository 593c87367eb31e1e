//! Domain types shared across the gateway

use serde::{Deserialize, Serialize};

use super::providers::ProviderId;

/// Who authored a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation, ordered oldest to newest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A file attached to the most recent user turn
///
/// At most one per request. Only providers with native multimodal input
/// actually forward it; the rest drop it silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Raw file bytes, already base64-encoded by the uploader
    pub base64: String,
    /// MIME type, e.g. `image/png`
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// A complete completion request as received from the client
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ConversationTurn>,
    #[serde(default)]
    pub file: Option<Attachment>,
    #[serde(default)]
    pub model: ProviderId,
}
