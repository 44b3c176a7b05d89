/*!
 * Per-request handler chain.
 *
 * A request passes through the stages in order:
 * 1. **Validation**: reject requests that cannot be translated
 * 2. **Execution**: call the backend under the retry policy
 * 3. **Persistence**: write the results into the checkpoint state
 * 4. **Logging**: append the attempts to the translation log
 *
 * A stage may halt the chain; stages that declare `runs_after_halt` still run.
 */

use async_trait::async_trait;
use log::warn;

use super::request::TranslationRequest;
use super::run_context::RunContext;

pub mod builder;
pub mod execution_handler;
pub mod logging_handler;
pub mod persistence_handler;
pub mod validation_handler;

// Re-export types used externally
pub use builder::{PipelineBuilder, StageSpec};
pub use execution_handler::ExecutionHandler;
pub use logging_handler::LoggingHandler;
pub use persistence_handler::PersistenceHandler;
pub use validation_handler::ValidationHandler;

/// Whether the chain goes on after a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

/// One stage of the chain
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Stage name used in logs
    fn name(&self) -> &'static str;

    async fn handle(&self, request: &mut TranslationRequest, ctx: &RunContext) -> Flow;

    /// Run even when an earlier stage halted
    fn runs_after_halt(&self) -> bool {
        false
    }
}

/// Ordered handler chain
pub struct TranslationPipeline {
    handlers: Vec<Box<dyn RequestHandler>>,
}

impl TranslationPipeline {
    pub(crate) fn new(handlers: Vec<Box<dyn RequestHandler>>) -> Self {
        Self { handlers }
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Run the request through every stage; the request is terminal on return
    pub async fn process(&self, request: &mut TranslationRequest, ctx: &RunContext) {
        let mut halted = false;

        for handler in &self.handlers {
            if halted && !handler.runs_after_halt() {
                continue;
            }
            if handler.runs_after_halt() {
                Self::ensure_terminal(request);
            }

            if handler.handle(request, ctx).await == Flow::Halt {
                halted = true;
            }
        }

        Self::ensure_terminal(request);
    }

    fn ensure_terminal(request: &mut TranslationRequest) {
        if !request.is_terminal() {
            warn!("Request {} left the chain without a result", request.index);
            request.mark_failed("pipeline: no stage produced a result");
        }
    }
}
