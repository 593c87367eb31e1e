//! Application constants and configuration defaults
//!
//! Centralized location for magic numbers and default values

use std::time::Duration;

/// HTTP client configuration
pub mod http {
    use super::*;

    /// Connection timeout for HTTP requests
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Streaming timeout - completions over slow providers can run for minutes
    pub const STREAM_TIMEOUT: Duration = Duration::from_secs(600);
}

/// AI/LLM configuration
pub mod ai {
    /// Sampling temperature for chat completions
    pub const COMPLETION_TEMPERATURE: f64 = 0.7;

    /// Maximum output tokens for title generation
    pub const TITLE_MAX_TOKENS: u32 = 50;

    /// Hard cap on generated titles, in characters
    pub const TITLE_MAX_CHARS: usize = 50;

    /// Characters kept before the ellipsis when a title is truncated
    pub const TITLE_TRUNCATE_AT: usize = 47;

    /// Seconds a caller should wait after a quota rejection
    pub const QUOTA_RETRY_AFTER_SECS: u64 = 86_400;
}
