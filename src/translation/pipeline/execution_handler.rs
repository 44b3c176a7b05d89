use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use async_trait::async_trait;
use log::{debug, warn};

use crate::errors::ProviderError;
use crate::session::models::Outcome;
use crate::translation::backend::{BackendRequest, BackendResponse, TokenUsage, TranslationBackend};
use crate::translation::request::{AttemptRecord, TranslationRequest};
use crate::translation::retry::{RetryPolicy, Sleeper};
use crate::translation::run_context::RunContext;
use super::{Flow, RequestHandler};

/// Calls the backend with retries, backoff and a per-attempt timeout
pub struct ExecutionHandler {
    backend: Arc<dyn TranslationBackend>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    model_hint: Option<String>,
}

impl ExecutionHandler {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        model_hint: Option<String>,
    ) -> Self {
        Self { backend, policy, sleeper, model_hint }
    }

    /// Results for exactly the requested languages. A missing or blank
    /// language fails the whole attempt.
    fn complete_results(
        response: BackendResponse,
        target_langs: &[String],
    ) -> Result<HashMap<String, String>, ProviderError> {
        let mut translations = response.translations;
        let mut results = HashMap::new();
        let mut missing = Vec::new();

        for lang in target_langs {
            match translations.remove(lang) {
                Some(text) if !text.trim().is_empty() => {
                    results.insert(lang.clone(), text);
                }
                _ => missing.push(lang.clone()),
            }
        }

        if missing.is_empty() {
            Ok(results)
        } else {
            Err(ProviderError::IncompleteResponse(missing))
        }
    }

    async fn attempt_once(&self, call: &BackendRequest) -> (Result<HashMap<String, String>, ProviderError>, TokenUsage) {
        match tokio::time::timeout(self.policy.attempt_timeout, self.backend.translate(call)).await {
            Ok(Ok(response)) => {
                let usage = response.usage;
                (Self::complete_results(response, &call.target_langs), usage)
            }
            Ok(Err(e)) => (Err(e), TokenUsage::default()),
            Err(_) => (Err(ProviderError::Timeout(self.policy.attempt_timeout)), TokenUsage::default()),
        }
    }
}

#[async_trait]
impl RequestHandler for ExecutionHandler {
    fn name(&self) -> &'static str {
        "execution"
    }

    async fn handle(&self, request: &mut TranslationRequest, _ctx: &RunContext) -> Flow {
        let call = BackendRequest {
            source_text: request.source_text.clone(),
            context: request.context.clone(),
            target_langs: request.target_langs.clone(),
            model_hint: self.model_hint.clone(),
        };
        let max_attempts = self.policy.max_attempts.max(1);

        loop {
            let attempt = request.begin_attempt();
            let started = Instant::now();
            let (result, usage) = self.attempt_once(&call).await;
            let duration = started.elapsed();

            match result {
                Ok(results) => {
                    request.record_attempt(AttemptRecord {
                        attempt,
                        outcome: Outcome::Success,
                        duration,
                        usage,
                        error: None,
                    });
                    request.mark_succeeded(results);
                    return Flow::Continue;
                }
                Err(e) => {
                    request.record_attempt(AttemptRecord {
                        attempt,
                        outcome: Outcome::Failed,
                        duration,
                        usage,
                        error: Some(e.to_string()),
                    });

                    if !e.is_transient() {
                        warn!("Request {} failed permanently: {}", request.index, e);
                        request.mark_failed(format!("execution: {}", e));
                        return Flow::Halt;
                    }
                    if attempt >= max_attempts {
                        warn!("Request {} failed after {} attempts: {}", request.index, attempt, e);
                        request.mark_failed(format!("execution: {} attempts exhausted: {}", attempt, e));
                        return Flow::Halt;
                    }

                    let delay = self.policy.delay_for(attempt);
                    debug!(
                        "Request {} attempt {}/{} failed ({}), retrying in {:?}",
                        request.index, attempt, max_attempts, e, delay
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }
}
