use async_trait::async_trait;
use log::debug;

use crate::errors::TranslationError;
use crate::translation::request::TranslationRequest;
use crate::translation::run_context::RunContext;
use super::{Flow, RequestHandler};

/// Rejects requests that cannot be sent to the backend
#[derive(Debug, Default)]
pub struct ValidationHandler;

impl ValidationHandler {
    pub fn new() -> Self {
        Self
    }

    fn check(request: &TranslationRequest) -> Result<(), TranslationError> {
        if request.source_text.trim().is_empty() {
            return Err(TranslationError::Validation("source text is empty".to_string()));
        }
        if request.target_langs.is_empty() {
            return Err(TranslationError::Validation("no target languages".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RequestHandler for ValidationHandler {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(&self, request: &mut TranslationRequest, _ctx: &RunContext) -> Flow {
        match Self::check(request) {
            Ok(()) => Flow::Continue,
            Err(e) => {
                debug!("Request {} rejected: {}", request.index, e);
                request.mark_failed(e.to_string());
                Flow::Halt
            }
        }
    }
}
