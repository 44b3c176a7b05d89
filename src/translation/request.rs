/*!
 * The unit of work carried through the handler chain.
 */

use std::collections::HashMap;
use std::time::Duration;

use crate::language_utils::dedup_language_codes;
use crate::session::models::Outcome;
use super::backend::TokenUsage;

/// Lifecycle of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

/// One backend attempt
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    pub outcome: Outcome,
    pub duration: Duration,
    pub usage: TokenUsage,
    pub error: Option<String>,
}

/// Translation of one source line into every target language
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub index: usize,
    pub source_text: String,
    pub context: String,
    pub target_langs: Vec<String>,
    attempt: u32,
    status: RequestStatus,
    results: HashMap<String, String>,
    last_error: Option<String>,
    attempts: Vec<AttemptRecord>,
    usage: TokenUsage,
}

impl TranslationRequest {
    /// Create a pending request; language codes are canonicalized and
    /// de-duplicated, first occurrence wins
    pub fn new<I, S>(index: usize, source_text: impl Into<String>, context: impl Into<String>, target_langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            index,
            source_text: source_text.into(),
            context: context.into(),
            target_langs: dedup_language_codes(target_langs),
            attempt: 0,
            status: RequestStatus::Pending,
            results: HashMap::new(),
            last_error: None,
            attempts: Vec::new(),
            usage: TokenUsage::default(),
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RequestStatus::Succeeded | RequestStatus::Failed)
    }

    /// Number of attempts started so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Translations, non-empty only once succeeded
    pub fn results(&self) -> &HashMap<String, String> {
        &self.results
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// Token usage accumulated over all attempts
    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    /// Start the next attempt and return its number
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.status = RequestStatus::InFlight;
        self.attempt
    }

    /// Record a finished attempt, success or not
    pub fn record_attempt(&mut self, record: AttemptRecord) {
        self.usage += record.usage;
        if let Some(error) = &record.error {
            self.last_error = Some(error.clone());
        }
        self.attempts.push(record);
    }

    /// Mark succeeded with a result per language. Empty results are a failure.
    pub fn mark_succeeded(&mut self, results: HashMap<String, String>) {
        if results.is_empty() {
            self.mark_failed("execution: empty result set");
            return;
        }
        self.results = results;
        self.status = RequestStatus::Succeeded;
    }

    /// Mark failed, discarding any results
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.results.clear();
        self.last_error = Some(error.into());
        self.status = RequestStatus::Failed;
    }
}
