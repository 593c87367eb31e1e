//! Provider error classification
//!
//! Maps upstream failures to the fixed set of handling policies that drive
//! fallback decisions. Classification is string/status based - the upstream
//! providers guarantee no structured error codes.

use std::time::Duration;

use thiserror::Error;

/// Handling policy for a failed upstream call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limit on a provider (HTTP 429 or a "quota" message)
    QuotaExceeded,
    /// Prepaid-credit exhaustion (HTTP 402 or balance/credit wording)
    InsufficientBalance,
    /// Anything else: auth, malformed response, network
    Other,
}

/// Classified outcome of a failed upstream call
#[derive(Debug, Clone, Error)]
#[error("{provider} API error ({kind:?}, status {status:?}): {message}")]
pub struct ProviderError {
    pub provider: super::providers::ProviderId,
    pub kind: ErrorKind,
    /// Upstream HTTP status, when one was received
    pub status: Option<u16>,
    pub message: String,
    /// Upstream Retry-After hint, when one was sent
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(
        provider: super::providers::ProviderId,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            provider,
            kind: classify(status, &message),
            status,
            message,
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn is_quota(&self) -> bool {
        self.kind == ErrorKind::QuotaExceeded
    }

    pub fn is_balance(&self) -> bool {
        self.kind == ErrorKind::InsufficientBalance
    }
}

/// Classify an upstream failure from its HTTP status and message text
///
/// Quota takes precedence: a 429 is a quota error even if the body also
/// mentions billing.
pub fn classify(status: Option<u16>, message: &str) -> ErrorKind {
    let lower = message.to_lowercase();

    if status == Some(429) || lower.contains("quota") || lower.contains("429") {
        return ErrorKind::QuotaExceeded;
    }

    if status == Some(402)
        || lower.contains("insufficient")
        || lower.contains("balance")
        || lower.contains("credit")
    {
        return ErrorKind::InsufficientBalance;
    }

    ErrorKind::Other
}

/// Parse a Retry-After header value
///
/// The header can be either a number of seconds (e.g. "120") or an HTTP date.
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    if let Ok(seconds) = header_value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date) = httpdate::parse_http_date(header_value) {
        let now = std::time::SystemTime::now();
        if let Ok(duration) = date.duration_since(now) {
            return Some(duration);
        }
    }

    None
}
