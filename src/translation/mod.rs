/*!
 * Batch translation engine.
 *
 * This module contains the per-request pipeline and the scheduler that
 * drives it. It is split into several submodules:
 *
 * - `request`: the unit of work and its outcome
 * - `backend`: the translation backend capability and the chat adapter
 * - `retry`: retry policy, backoff and sleepers
 * - `run_context`: per-run counters, cancellation and statistics
 * - `pipeline`: the handler chain and its builder
 * - `batch`: concurrent batch scheduling and checkpoints
 */

// Re-export main types for easier usage
pub use self::backend::{BackendRequest, BackendResponse, ChatBackend, PromptTemplate, TokenUsage, TranslationBackend};
pub use self::batch::{BatchScheduler, ProgressCallback, SchedulerConfig};
pub use self::pipeline::{Flow, PipelineBuilder, RequestHandler, StageSpec, TranslationPipeline};
pub use self::request::{AttemptRecord, RequestStatus, TranslationRequest};
pub use self::retry::{RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
pub use self::run_context::{RunContext, RunStats};

// Submodules
pub mod backend;
pub mod batch;
pub mod pipeline;
pub mod request;
pub mod retry;
pub mod run_context;
