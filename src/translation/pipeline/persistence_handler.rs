use async_trait::async_trait;
use log::{debug, warn};

use crate::session::manager::SharedCheckpoint;
use crate::translation::request::{RequestStatus, TranslationRequest};
use crate::translation::run_context::RunContext;
use super::{Flow, RequestHandler};

/// Writes results into the subtitle store and marks the index complete.
///
/// With a failure placeholder configured, failed requests get the placeholder
/// in every language but stay pending in the progress index.
pub struct PersistenceHandler {
    state: SharedCheckpoint,
    failure_placeholder: Option<String>,
}

impl PersistenceHandler {
    pub fn new(state: SharedCheckpoint, failure_placeholder: Option<String>) -> Self {
        Self { state, failure_placeholder }
    }
}

#[async_trait]
impl RequestHandler for PersistenceHandler {
    fn name(&self) -> &'static str {
        "persistence"
    }

    async fn handle(&self, request: &mut TranslationRequest, _ctx: &RunContext) -> Flow {
        match request.status() {
            RequestStatus::Succeeded => {
                let missing: Vec<&str> = request
                    .target_langs
                    .iter()
                    .filter(|lang| !request.results().contains_key(*lang))
                    .map(String::as_str)
                    .collect();
                if !missing.is_empty() {
                    let error = format!("persistence: no result for {}", missing.join(", "));
                    warn!("Request {}: {}", request.index, error);
                    request.mark_failed(error);
                    return Flow::Continue;
                }

                let mut state = self.state.lock();
                for lang in &request.target_langs {
                    if let Some(text) = request.results().get(lang) {
                        state.store.write(lang, request.index, text);
                    }
                }
                state.progress.mark_done(request.index);
                debug!("Request {} stored for {} languages", request.index, request.target_langs.len());
            }
            RequestStatus::Failed => {
                if let Some(placeholder) = &self.failure_placeholder {
                    let mut state = self.state.lock();
                    for lang in &request.target_langs {
                        state.store.write(lang, request.index, placeholder);
                    }
                }
            }
            RequestStatus::Pending | RequestStatus::InFlight => {}
        }
        Flow::Continue
    }

    fn runs_after_halt(&self) -> bool {
        self.failure_placeholder.is_some()
    }
}
