use std::sync::Arc;
use async_trait::async_trait;
use log::{info, warn};

use crate::errors::AppError;
use crate::session::journal::TranslationJournal;
use crate::session::models::{LogRecord, Outcome};
use crate::translation::request::{RequestStatus, TranslationRequest};
use crate::translation::run_context::RunContext;
use super::{Flow, RequestHandler};

/// Appends the attempts of a request to the translation log
pub struct LoggingHandler {
    journal: Arc<TranslationJournal>,
}

impl LoggingHandler {
    pub fn new(journal: Arc<TranslationJournal>) -> Self {
        Self { journal }
    }

    /// One record per attempt, or a single attempt-0 record when the backend
    /// was never called. The last record is final and carries the request's
    /// outcome.
    pub fn records_for(request: &TranslationRequest, run_id: &str) -> Vec<LogRecord> {
        let final_outcome = if request.status() == RequestStatus::Succeeded {
            Outcome::Success
        } else {
            Outcome::Failed
        };

        let mut records: Vec<LogRecord> = request
            .attempts()
            .iter()
            .map(|attempt| {
                let mut record = LogRecord::new(run_id, request.index, attempt.attempt, attempt.outcome);
                record.input_tokens = attempt.usage.input_tokens;
                record.output_tokens = attempt.usage.output_tokens;
                record.duration_ms = attempt.duration.as_millis() as u64;
                record.error = attempt.error.clone();
                record
            })
            .collect();

        if records.is_empty() {
            records.push(LogRecord::new(run_id, request.index, 0, final_outcome));
        }

        if let Some(last) = records.last_mut() {
            last.is_final = true;
            last.outcome = final_outcome;
            if final_outcome == Outcome::Failed {
                last.error = request.last_error().map(str::to_string);
            }
        }
        records
    }
}

#[async_trait]
impl RequestHandler for LoggingHandler {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, request: &mut TranslationRequest, ctx: &RunContext) -> Flow {
        let records = Self::records_for(request, ctx.run_id());

        match request.status() {
            RequestStatus::Succeeded => info!(
                "Entry {} translated ({} attempt(s), {} tokens)",
                request.index,
                request.attempt(),
                request.usage().total()
            ),
            _ => warn!(
                "Entry {} failed after {} attempt(s): {}",
                request.index,
                request.attempt(),
                request.last_error().unwrap_or("unknown error")
            ),
        }

        if let Err(e) = self.journal.append(&records) {
            ctx.report_fatal(AppError::Persistence(format!("{:#}", e)));
        }
        Flow::Continue
    }

    fn runs_after_halt(&self) -> bool {
        true
    }
}
