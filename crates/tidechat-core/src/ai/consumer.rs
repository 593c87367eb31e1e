//! Completion stream consumption helpers
//!
//! Decodes a byte stream into text incrementally and reports the cumulative
//! string after each chunk, so a display layer can re-render the whole
//! message instead of tracking concatenation itself. Also hosts the single
//! classifier that decides how a failure is worded for display.

use bytes::Bytes;
use futures::{Stream, StreamExt};

/// Fixed wording shown for rate-limit failures
pub const RATE_LIMIT_NOTICE: &str = "You've reached the daily limit of 20 requests. Please try again in 24 hours or upgrade your API plan.";

/// How a failure should be presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayNotice {
    /// Provider rate limit; shown with the fixed daily-limit wording
    RateLimited,
    /// Any other failure; shown with the raw message text
    Failure(String),
}

impl DisplayNotice {
    pub fn message(&self) -> &str {
        match self {
            DisplayNotice::RateLimited => RATE_LIMIT_NOTICE,
            DisplayNotice::Failure(message) => message,
        }
    }
}

/// Classify a failure for display
///
/// Every surface that shows errors goes through here so the rate-limit
/// wording stays identical across flows.
pub fn classify_for_display(status: Option<u16>, message: &str) -> DisplayNotice {
    if status == Some(429) || message.to_lowercase().contains("quota") {
        DisplayNotice::RateLimited
    } else {
        DisplayNotice::Failure(message.to_string())
    }
}

/// Incremental UTF-8 decoder for byte streams
///
/// A multi-byte sequence split across reads is held back until its
/// remaining bytes arrive; invalid sequences become replacement characters.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    carry: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, including any bytes carried from the last one
    pub fn decode(&mut self, input: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(input);

        let mut out = String::new();
        let mut rest = buf.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(error) => {
                    let (valid, tail) = rest.split_at(error.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match error.error_len() {
                        Some(invalid_len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[invalid_len..];
                        }
                        None => {
                            // Incomplete sequence at the end of the chunk
                            self.carry = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Drain a completion byte stream, reporting cumulative text per chunk
///
/// The callback receives the full accumulated string after every chunk, not
/// the delta. Returns the final accumulated string once the stream closes,
/// or the stream's error as soon as one occurs.
pub async fn consume_stream<S, E, F>(mut stream: S, mut on_update: F) -> Result<String, E>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    F: FnMut(&str),
{
    let mut decoder = Utf8StreamDecoder::new();
    let mut accumulated = String::new();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        let text = decoder.decode(&bytes);
        if !text.is_empty() {
            accumulated.push_str(&text);
        }
        on_update(&accumulated);
    }

    Ok(accumulated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn byte_stream(
        chunks: &[&[u8]],
    ) -> impl Stream<Item = Result<Bytes, Infallible>> + Unpin {
        futures::stream::iter(
            chunks
                .iter()
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_cumulative_updates() {
        let mut updates = Vec::new();
        let result = consume_stream(byte_stream(&[b"Hel", b"lo"]), |s| {
            updates.push(s.to_string());
        })
        .await
        .unwrap();
        assert_eq!(result, "Hello");
        assert_eq!(updates, vec!["Hel".to_string(), "Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_single_chunk_same_result() {
        let result = consume_stream(byte_stream(&[b"Hello"]), |_| {}).await.unwrap();
        assert_eq!(result, "Hello");
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        // "é" is 0xC3 0xA9; split between the two bytes
        let result = consume_stream(byte_stream(&[b"caf\xC3", b"\xA9!"]), |_| {})
            .await
            .unwrap();
        assert_eq!(result, "café!");
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let mut called = 0;
        let result = consume_stream(byte_stream(&[]), |_| called += 1).await.unwrap();
        assert_eq!(result, "");
        assert_eq!(called, 0);
    }

    #[test]
    fn test_decoder_invalid_byte_replaced() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"ok\xFFok"), "ok\u{FFFD}ok");
    }

    #[test]
    fn test_decoder_carry_flushed_on_next_chunk() {
        let mut decoder = Utf8StreamDecoder::new();
        // Four-byte emoji split 1+3
        assert_eq!(decoder.decode(b"\xF0"), "");
        assert_eq!(decoder.decode(b"\x9F\x98\x80"), "😀");
    }

    #[test]
    fn test_classify_rate_limit_by_status() {
        assert_eq!(
            classify_for_display(Some(429), "whatever"),
            DisplayNotice::RateLimited
        );
        assert_eq!(DisplayNotice::RateLimited.message(), RATE_LIMIT_NOTICE);
    }

    #[test]
    fn test_classify_rate_limit_by_message() {
        assert_eq!(
            classify_for_display(Some(500), "Quota exceeded for today"),
            DisplayNotice::RateLimited
        );
    }

    #[test]
    fn test_classify_other_keeps_raw_message() {
        let notice = classify_for_display(Some(500), "upstream broke");
        assert_eq!(notice, DisplayNotice::Failure("upstream broke".to_string()));
        assert_eq!(notice.message(), "upstream broke");
    }
}
