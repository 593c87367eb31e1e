//! Completion dispatch and provider fallback
//!
//! One request flows through an explicit state machine: try the selected
//! provider, optionally hop once to the designated fallback when the failure
//! is classified as exhaustion, then either stream or fail. At most one
//! fallback hop is ever attempted.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::client::{CompletionBackend, CompletionRequest};
use super::error::ProviderError;
use super::providers::ProviderId;
use super::types::ChatRequest;
use crate::constants;

/// System instruction sent with every completion request
pub const ASSISTANT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. You can analyze images and files when provided. Be concise but thorough in your responses.";

/// A successfully opened completion stream
#[derive(Debug)]
pub struct CompletionOutcome {
    /// Provider that is actually serving the stream
    pub provider: ProviderId,
    /// Whether the stream came from the fallback rather than the selection
    pub fell_back: bool,
    /// Live text fragments, closed when the upstream finishes
    pub stream: mpsc::UnboundedReceiver<String>,
}

/// Dispatch state for one completion request
enum Dispatch {
    TryPrimary(ProviderId),
    TryFallback {
        target: ProviderId,
        primary_error: ProviderError,
    },
    Streaming(CompletionOutcome),
    Failed(ProviderError),
}

/// Routes completion requests to providers with exhaustion fallback
pub struct CompletionGateway {
    backend: Arc<dyn CompletionBackend>,
}

impl CompletionGateway {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Open a completion stream, falling back once on provider exhaustion
    ///
    /// When both the selected provider and its fallback fail, the error
    /// returned is the selected provider's, not the fallback's. A quota
    /// failure on the preferred provider stays a quota failure even if the
    /// fallback then breaks for some unrelated reason.
    pub async fn stream_completion(
        &self,
        request: &ChatRequest,
    ) -> Result<CompletionOutcome, ProviderError> {
        let mut state = Dispatch::TryPrimary(request.model);

        loop {
            state = match state {
                Dispatch::TryPrimary(provider) => {
                    match self.open(provider, request).await {
                        Ok(stream) => Dispatch::Streaming(CompletionOutcome {
                            provider,
                            fell_back: false,
                            stream,
                        }),
                        Err(error) => match fallback_target(provider, &error) {
                            Some(target) => {
                                warn!(
                                    "{} failed ({:?}), falling back to {}: {}",
                                    provider, error.kind, target, error.message
                                );
                                Dispatch::TryFallback {
                                    target,
                                    primary_error: error,
                                }
                            }
                            None => Dispatch::Failed(error),
                        },
                    }
                }
                Dispatch::TryFallback {
                    target,
                    primary_error,
                } => match self.open(target, request).await {
                    Ok(stream) => {
                        info!("Fallback to {} succeeded", target);
                        Dispatch::Streaming(CompletionOutcome {
                            provider: target,
                            fell_back: true,
                            stream,
                        })
                    }
                    Err(fallback_error) => {
                        // The first failure keeps precedence over whatever
                        // went wrong on the fallback
                        warn!(
                            "Fallback {} also failed: {}",
                            target, fallback_error.message
                        );
                        Dispatch::Failed(primary_error)
                    }
                },
                Dispatch::Streaming(outcome) => return Ok(outcome),
                Dispatch::Failed(error) => return Err(error),
            };
        }
    }

    async fn open(
        &self,
        provider: ProviderId,
        request: &ChatRequest,
    ) -> Result<mpsc::UnboundedReceiver<String>, ProviderError> {
        self.backend
            .open_stream(
                provider,
                CompletionRequest {
                    turns: &request.messages,
                    attachment: request.file.as_ref(),
                    system_prompt: ASSISTANT_SYSTEM_PROMPT,
                    temperature: Some(constants::ai::COMPLETION_TEMPERATURE),
                },
            )
            .await
    }
}

/// Decide whether a failure warrants the single fallback hop
///
/// Quota exhaustion reroutes away from the default provider; balance
/// exhaustion reroutes a non-default provider back to the default. Anything
/// unclassified fails in place.
fn fallback_target(provider: ProviderId, error: &ProviderError) -> Option<ProviderId> {
    let is_default = provider == ProviderId::default();
    if (error.is_quota() && is_default) || (error.is_balance() && !is_default) {
        provider.completion_fallback()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::ConversationTurn;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Backend with canned per-provider outcomes
    struct MockBackend {
        outcomes: HashMap<ProviderId, Result<Vec<String>, (Option<u16>, String)>>,
        calls: Mutex<Vec<ProviderId>>,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                outcomes: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn succeeds(mut self, provider: ProviderId, fragments: &[&str]) -> Self {
            self.outcomes.insert(
                provider,
                Ok(fragments.iter().map(|s| s.to_string()).collect()),
            );
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
            self.calls.lock().unwrap().push(provider);
            match self.outcomes.get(&provider) {
                Some(Ok(fragments)) => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    for fragment in fragments {
                        tx.send(fragment.clone()).unwrap();
                    }
                    Ok(rx)
                }
                Some(Err((status, message))) => {
                    Err(ProviderError::new(provider, *status, message.clone()))
                }
                None => Err(ProviderError::new(provider, None, "no canned outcome")),
            }
        }

        async fn complete(
            &self,
            provider: ProviderId,
            _system_prompt: &str,
            _user_message: &str,
            _max_tokens: u32,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::new(provider, None, "not used"))
        }

        fn is_configured(&self, provider: ProviderId) -> bool {
            self.outcomes.contains_key(&provider)
        }
    }

    fn request_for(model: ProviderId) -> ChatRequest {
        ChatRequest {
            messages: vec![ConversationTurn::user("hi")],
            file: None,
            model,
        }
    }

    async fn collect(mut rx: mpsc::UnboundedReceiver<String>) -> String {
        let mut out = String::new();
        while let Some(fragment) = rx.recv().await {
            out.push_str(&fragment);
        }
        out
    }

    #[tokio::test]
    async fn test_primary_success_no_fallback() {
        let backend = MockBackend::new().succeeds(ProviderId::Gemini, &["Hel", "lo"]);
        let backend = Arc::new(backend);
        let gateway = CompletionGateway::new(backend.clone());

        let outcome = gateway
            .stream_completion(&request_for(ProviderId::Gemini))
            .await
            .unwrap();
        assert_eq!(outcome.provider, ProviderId::Gemini);
        assert!(!outcome.fell_back);
        assert_eq!(collect(outcome.stream).await, "Hello");
        assert_eq!(backend.calls(), vec![ProviderId::Gemini]);
    }

    #[tokio::test]
    async fn test_gemini_quota_falls_back_to_mistral() {
        let backend = Arc::new(
            MockBackend::new()
                .fails(ProviderId::Gemini, Some(429), "Quota exceeded")
                .succeeds(ProviderId::Mistral, &["from mistral"]),
        );
        let gateway = CompletionGateway::new(backend.clone());

        let outcome = gateway
            .stream_completion(&request_for(ProviderId::Gemini))
            .await
            .unwrap();
        assert_eq!(outcome.provider, ProviderId::Mistral);
        assert!(outcome.fell_back);
        assert_eq!(collect(outcome.stream).await, "from mistral");
        assert_eq!(backend.calls(), vec![ProviderId::Gemini, ProviderId::Mistral]);
    }

    #[tokio::test]
    async fn test_mistral_balance_falls_back_to_gemini() {
        let backend = Arc::new(
            MockBackend::new()
                .fails(ProviderId::Mistral, Some(402), "Insufficient Balance")
                .succeeds(ProviderId::Gemini, &["from gemini"]),
        );
        let gateway = CompletionGateway::new(backend.clone());

        let outcome = gateway
            .stream_completion(&request_for(ProviderId::Mistral))
            .await
            .unwrap();
        assert_eq!(outcome.provider, ProviderId::Gemini);
        assert!(outcome.fell_back);
    }

    #[tokio::test]
    async fn test_both_fail_surfaces_primary_error() {
        let backend = Arc::new(
            MockBackend::new()
                .fails(ProviderId::Gemini, Some(429), "Quota exceeded for today")
                .fails(ProviderId::Mistral, Some(401), "invalid api key"),
        );
        let gateway = CompletionGateway::new(backend);

        let err = gateway
            .stream_completion(&request_for(ProviderId::Gemini))
            .await
            .unwrap_err();
        // The quota shape survives, not the fallback's auth failure
        assert_eq!(err.provider, ProviderId::Gemini);
        assert!(err.is_quota());
        assert_eq!(err.message, "Quota exceeded for today");
    }

    #[tokio::test]
    async fn test_unclassified_error_no_fallback() {
        let backend = Arc::new(
            MockBackend::new()
                .fails(ProviderId::Gemini, Some(401), "invalid api key")
                .succeeds(ProviderId::Mistral, &["never reached"]),
        );
        let gateway = CompletionGateway::new(backend.clone());

        let err = gateway
            .stream_completion(&request_for(ProviderId::Gemini))
            .await
            .unwrap_err();
        assert_eq!(err.provider, ProviderId::Gemini);
        assert_eq!(backend.calls(), vec![ProviderId::Gemini]);
    }

    #[tokio::test]
    async fn test_quota_on_non_default_does_not_fall_back() {
        let backend = Arc::new(
            MockBackend::new()
                .fails(ProviderId::Mistral, Some(429), "rate limited")
                .succeeds(ProviderId::Gemini, &["never reached"]),
        );
        let gateway = CompletionGateway::new(backend.clone());

        let err = gateway
            .stream_completion(&request_for(ProviderId::Mistral))
            .await
            .unwrap_err();
        assert_eq!(err.provider, ProviderId::Mistral);
        assert_eq!(backend.calls(), vec![ProviderId::Mistral]);
    }

    #[tokio::test]
    async fn test_balance_on_default_does_not_fall_back() {
        let backend = Arc::new(
            MockBackend::new()
                .fails(ProviderId::Gemini, Some(402), "insufficient funds")
                .succeeds(ProviderId::Mistral, &["never reached"]),
        );
        let gateway = CompletionGateway::new(backend.clone());

        let err = gateway
            .stream_completion(&request_for(ProviderId::Gemini))
            .await
            .unwrap_err();
        assert_eq!(err.provider, ProviderId::Gemini);
        assert_eq!(backend.calls(), vec![ProviderId::Gemini]);
    }
}
