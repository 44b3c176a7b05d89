/*!
 * Mock provider implementations for testing and dry runs.
 *
 * This module provides:
 * - `MockBackend` - a scripted `TranslationBackend` answering `"[lang] text"`
 *   that can fail transiently, permanently, for given texts or for the first
 *   N calls, counts every call per source text and tracks the peak number
 *   of calls in flight
 * - `MockChatProvider` - a chat `Provider` returning a canned answer
 */

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ProviderError;
use crate::providers::{ChatRequest, ChatResponse, Provider};
use crate::translation::backend::{BackendRequest, BackendResponse, TokenUsage, TranslationBackend};

/// Usage reported for every successful mock call
pub const MOCK_USAGE: TokenUsage = TokenUsage { input_tokens: 10, output_tokens: 5 };

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with a retryable error
    TransientFailure,
    /// Always rejects the last requested language, which is not retryable
    PermanentFailure,
    /// The first `calls` calls fail transiently, later calls succeed
    FailFirst { calls: usize },
    /// Succeeds but leaves out the last requested language
    Incomplete,
    /// Succeeds after a delay (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Scripted translation backend
#[derive(Debug, Clone)]
pub struct MockBackend {
    behavior: MockBehavior,
    // @field: Texts that always fail transiently regardless of behavior
    failing_texts: Arc<HashSet<String>>,
    request_count: Arc<AtomicUsize>,
    per_text: Arc<Mutex<HashMap<String, usize>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight gauge when a call returns
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            failing_texts: Arc::new(HashSet::new()),
            request_count: Arc::new(AtomicUsize::new(0)),
            per_text: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working mock backend that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a backend that always fails transiently
    pub fn transient() -> Self {
        Self::new(MockBehavior::TransientFailure)
    }

    /// Create a backend that always fails permanently
    pub fn permanent() -> Self {
        Self::new(MockBehavior::PermanentFailure)
    }

    /// Create a backend whose first `calls` calls fail transiently
    pub fn fail_first(calls: usize) -> Self {
        Self::new(MockBehavior::FailFirst { calls })
    }

    /// Create a backend answering after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Make every call for one of `texts` fail transiently
    pub fn with_failing_texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_texts = Arc::new(texts.into_iter().map(Into::into).collect());
        self
    }

    /// Total number of calls
    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Number of calls made for a source text
    pub fn calls_for(&self, text: &str) -> usize {
        self.per_text.lock().get(text).copied().unwrap_or(0)
    }

    /// Highest number of calls that were running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn respond(request: &BackendRequest, langs: &[String]) -> BackendResponse {
        let translations = langs
            .iter()
            .map(|lang| (lang.clone(), format!("[{}] {}", lang, request.source_text)))
            .collect();
        BackendResponse { translations, usage: MOCK_USAGE }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn translate(&self, request: &BackendRequest) -> Result<BackendResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        *self.per_text.lock().entry(request.source_text.clone()).or_insert(0) += 1;

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        if self.failing_texts.contains(&request.source_text) {
            return Err(ProviderError::ApiError {
                status_code: 503,
                message: format!("Simulated failure for {:?}", request.source_text),
            });
        }

        match self.behavior {
            MockBehavior::Working => Ok(Self::respond(request, &request.target_langs)),

            MockBehavior::TransientFailure => Err(ProviderError::ConnectionError(
                format!("Simulated connection reset (request #{})", count + 1),
            )),

            MockBehavior::PermanentFailure => Err(ProviderError::UnsupportedLanguage(
                request.target_langs.last().cloned().unwrap_or_default(),
            )),

            MockBehavior::FailFirst { calls } => {
                if count < calls {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    })
                } else {
                    Ok(Self::respond(request, &request.target_langs))
                }
            }

            MockBehavior::Incomplete => {
                let keep = request.target_langs.len().saturating_sub(1);
                Ok(Self::respond(request, &request.target_langs[..keep]))
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Self::respond(request, &request.target_langs))
            }
        }
    }
}

/// Chat provider returning a fixed answer
#[derive(Debug, Clone)]
pub struct MockChatProvider {
    reply: String,
    last_model: Arc<Mutex<Option<String>>>,
}

impl MockChatProvider {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            last_model: Arc::new(Mutex::new(None)),
        }
    }

    /// Model named by the most recent request
    pub fn last_model(&self) -> Option<String> {
        self.last_model.lock().clone()
    }
}

#[async_trait]
impl Provider for MockChatProvider {
    type Request = ChatRequest;
    type Response = ChatResponse;

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        *self.last_model.lock() = Some(request.model);
        Ok(ChatResponse {
            text: self.reply.clone(),
            usage: TokenUsage::new(12, 6),
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn extract_text(response: &ChatResponse) -> String {
        response.text.clone()
    }
}
