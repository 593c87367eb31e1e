//! SSE (Server-Sent Events) stream processing utilities
//!
//! Handles parsing of SSE streams from AI providers. Reads may end mid-line,
//! so the processor carries the incomplete trailing line across chunks
//! instead of assuming each read yields whole lines.

use std::time::Instant;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events that can be parsed from SSE data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A fragment of assistant text
    TextDelta(String),
    /// Upstream signaled completion
    Finish,
    /// Event should be ignored
    Skip,
}

/// Trait for provider-specific SSE parsing logic
pub trait SseParser: Send + Sync {
    /// Parse a JSON event into an SSE event
    fn parse_event(&self, json: &Value) -> SseEvent;
}

/// Outcome of feeding one chunk of bytes to the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamProgress {
    /// More upstream data expected
    Active,
    /// Upstream signaled the end of the stream
    Finished,
    /// The downstream consumer went away; stop reading upstream
    DownstreamClosed,
}

/// Common SSE stream processor that handles partial lines and buffering
pub struct SseStreamProcessor {
    /// Accumulated partial line from the previous chunk
    partial_line: String,
    /// Channel carrying decoded text fragments downstream
    tx: mpsc::UnboundedSender<String>,
    /// When the stream started
    stream_start: Instant,
    /// Event counter for logging
    event_count: usize,
    /// Bytes received counter
    bytes_received: usize,
}

impl SseStreamProcessor {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        debug!("SSE stream processor created");
        Self {
            partial_line: String::new(),
            tx,
            stream_start: Instant::now(),
            event_count: 0,
            bytes_received: 0,
        }
    }

    /// Process a chunk of bytes from the SSE stream
    ///
    /// Fragments are relayed downstream as soon as they parse; a malformed
    /// `data:` payload is skipped, never fatal.
    pub fn process_chunk<P: SseParser + ?Sized>(&mut self, bytes: &[u8], parser: &P) -> StreamProgress {
        self.bytes_received += bytes.len();
        let text = String::from_utf8_lossy(bytes);

        // Combine with any partial line from the previous chunk
        let combined = if self.partial_line.is_empty() {
            text.into_owned()
        } else {
            let mut combined = std::mem::take(&mut self.partial_line);
            combined.push_str(&text);
            combined
        };

        debug!(
            "SSE chunk received: {} bytes (total: {} bytes)",
            bytes.len(),
            self.bytes_received
        );

        let has_trailing_newline = combined.ends_with('\n');
        let mut lines_iter = combined.lines().peekable();

        while let Some(line) = lines_iter.next() {
            // The last line without a trailing newline is partial; hold it
            // back for the next read
            if lines_iter.peek().is_none() && !has_trailing_newline {
                self.partial_line = line.to_string();
                break;
            }

            // Skip empty lines and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data: ") {
                match self.process_sse_data(data, parser) {
                    StreamProgress::Active => {}
                    done => return done,
                }
            }
        }

        StreamProgress::Active
    }

    /// Process one SSE data payload using the provider-specific parser
    pub fn process_sse_data<P: SseParser + ?Sized>(&mut self, data: &str, parser: &P) -> StreamProgress {
        self.event_count += 1;
        let elapsed = self.stream_start.elapsed();

        // End-of-stream marker used by OpenAI-compatible providers
        if data == "[DONE]" {
            info!(
                "SSE stream [DONE] after {:?}, {} events, {} bytes",
                elapsed, self.event_count, self.bytes_received
            );
            return StreamProgress::Finished;
        }

        match serde_json::from_str::<Value>(data) {
            Ok(json) => match parser.parse_event(&json) {
                SseEvent::TextDelta(text) => {
                    debug!("SSE event #{} at {:?}: {} chars", self.event_count, elapsed, text.len());
                    if self.tx.send(text).is_err() {
                        info!("Downstream closed after {} events, stopping relay", self.event_count);
                        return StreamProgress::DownstreamClosed;
                    }
                }
                SseEvent::Finish => {
                    info!(
                        "SSE finish at {:?} ({} events, {} bytes)",
                        elapsed, self.event_count, self.bytes_received
                    );
                    return StreamProgress::Finished;
                }
                SseEvent::Skip => {
                    debug!("SSE event #{}: skipped", self.event_count);
                }
            },
            Err(_) if !data.trim().is_empty() => {
                warn!(
                    "Failed to parse SSE JSON (event #{}): {}",
                    self.event_count, data
                );
            }
            Err(_) => {}
        }

        StreamProgress::Active
    }
}
