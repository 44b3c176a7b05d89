/*!
 * Per-run shared state: identity, counters, cancellation and fatal errors.
 *
 * A `RunContext` is created for each run and shared through an `Arc` with
 * every worker task; at the end it is folded into `RunStats`.
 */

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use log::error;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use super::backend::TokenUsage;
use super::request::{RequestStatus, TranslationRequest};

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub total_pending: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Indices that ended failed, ascending
    pub failed_indices: Vec<usize>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub elapsed: Duration,
    /// The run stopped before every pending index was processed
    pub interrupted: bool,
}

impl RunStats {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed of {} pending in {:.1}s (tokens: {} in / {} out){}",
            self.succeeded,
            self.failed,
            self.total_pending,
            self.elapsed.as_secs_f64(),
            self.input_tokens,
            self.output_tokens,
            if self.interrupted { ", interrupted" } else { "" }
        )
    }
}

/// State shared by all tasks of one run
#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    started: Instant,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    failed_indices: Mutex<Vec<usize>>,
    fatal: Mutex<Option<AppError>>,
    cancelled: AtomicBool,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Create a context with a fresh run id
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            failed_indices: Mutex::new(Vec::new()),
            fatal: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Count a request that went through the whole chain
    pub fn record_outcome(&self, request: &TranslationRequest) {
        let usage = request.usage();
        self.input_tokens.fetch_add(usage.input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(usage.output_tokens, Ordering::Relaxed);

        match request.status() {
            RequestStatus::Succeeded => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.failed_indices.lock().push(request.index);
            }
        }
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn usage(&self) -> TokenUsage {
        TokenUsage::new(
            self.input_tokens.load(Ordering::Relaxed),
            self.output_tokens.load(Ordering::Relaxed),
        )
    }

    /// Report an error that must stop the run; the first one is kept
    pub fn report_fatal(&self, err: AppError) {
        error!("Run {} stopping: {}", &self.run_id[..8], err);
        let mut slot = self.fatal.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal.lock().is_some()
    }

    pub fn take_fatal(&self) -> Option<AppError> {
        self.fatal.lock().take()
    }

    /// Stop dispatching new work; in-flight requests finish
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fold the counters into run statistics
    pub fn finish(&self, total_pending: usize, interrupted: bool) -> RunStats {
        let mut failed_indices = self.failed_indices.lock().clone();
        failed_indices.sort_unstable();
        let usage = self.usage();

        RunStats {
            total_pending,
            succeeded: self.succeeded(),
            failed: self.failed(),
            failed_indices,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            elapsed: self.elapsed(),
            interrupted,
        }
    }
}
