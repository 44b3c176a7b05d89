/*!
 * Session management for resumable translation runs.
 *
 * This module provides:
 * - The progress index of completed entries
 * - The append-only translation log
 * - Checkpointing and resume of the output directory
 */

pub mod journal;
pub mod manager;
pub mod models;
pub mod progress;

// Re-export main types
pub use journal::TranslationJournal;
pub use manager::{CheckpointState, SessionFiles, SessionManager, SessionOptions, SharedCheckpoint};
pub use models::{LogRecord, Outcome, RunMetadata, SessionStatus};
pub use progress::ProgressIndex;
