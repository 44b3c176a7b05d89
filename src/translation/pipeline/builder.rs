use std::sync::Arc;

use crate::errors::AppError;
use crate::session::journal::TranslationJournal;
use crate::session::manager::SharedCheckpoint;
use crate::translation::backend::TranslationBackend;
use crate::translation::retry::{RetryPolicy, Sleeper};
use super::{
    ExecutionHandler, LoggingHandler, PersistenceHandler, RequestHandler, TranslationPipeline,
    ValidationHandler,
};

/// Description of one stage to build
#[derive(Clone)]
pub enum StageSpec {
    Validation,
    Execution {
        backend: Arc<dyn TranslationBackend>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        model_hint: Option<String>,
    },
    Persistence {
        state: SharedCheckpoint,
        failure_placeholder: Option<String>,
    },
    Logging {
        journal: Arc<TranslationJournal>,
    },
}

impl StageSpec {
    fn into_handler(self) -> Box<dyn RequestHandler> {
        match self {
            StageSpec::Validation => Box::new(ValidationHandler::new()),
            StageSpec::Execution { backend, policy, sleeper, model_hint } => {
                Box::new(ExecutionHandler::new(backend, policy, sleeper, model_hint))
            }
            StageSpec::Persistence { state, failure_placeholder } => {
                Box::new(PersistenceHandler::new(state, failure_placeholder))
            }
            StageSpec::Logging { journal } => Box::new(LoggingHandler::new(journal)),
        }
    }
}

/// Assembles a `TranslationPipeline`; stages run in the order added
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<StageSpec>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder holding `specs` in order
    pub fn from_specs(specs: Vec<StageSpec>) -> Self {
        Self { stages: specs }
    }

    pub fn add_stage(mut self, spec: StageSpec) -> Self {
        self.stages.push(spec);
        self
    }

    pub fn add_validation(self) -> Self {
        self.add_stage(StageSpec::Validation)
    }

    pub fn add_execution(
        self,
        backend: Arc<dyn TranslationBackend>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        model_hint: Option<String>,
    ) -> Self {
        self.add_stage(StageSpec::Execution { backend, policy, sleeper, model_hint })
    }

    pub fn add_persistence(self, state: SharedCheckpoint, failure_placeholder: Option<String>) -> Self {
        self.add_stage(StageSpec::Persistence { state, failure_placeholder })
    }

    pub fn add_logging(self, journal: Arc<TranslationJournal>) -> Self {
        self.add_stage(StageSpec::Logging { journal })
    }

    /// Drop every stage added so far
    pub fn reset(&mut self) {
        self.stages.clear();
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Build the pipeline; an empty builder is a configuration error
    pub fn build(self) -> Result<TranslationPipeline, AppError> {
        if self.stages.is_empty() {
            return Err(AppError::Configuration("Pipeline must have at least one handler".to_string()));
        }
        Ok(TranslationPipeline::new(
            self.stages.into_iter().map(StageSpec::into_handler).collect(),
        ))
    }
}
