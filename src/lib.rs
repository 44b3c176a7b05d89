/*!
 * # lingobatch - concurrent, resumable subtitle translation
 *
 * A Rust library for translating subtitle files into several languages at
 * once with a chat model backend.
 *
 * ## Features
 *
 * - Translate every entry of an SRT file into all target languages in one request
 * - Bounded worker pool with batched dispatch
 * - Retry with exponential backoff and jitter for transient backend failures
 * - Checkpoints after each batch; interrupted runs resume where they stopped
 * - Append-only JSON Lines log of every attempt, used to retry failed entries
 * - OpenAI-compatible providers (Groq, OpenAI, LM Studio) and a mock backend
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT parsing and writing, source catalog with context
 * - `subtitle_store`: Translated lines per language
 * - `session`: Progress index, translation log and checkpoints
 * - `translation`: The translation engine:
 *   - `translation::pipeline`: Per-request handler chain and its builder
 *   - `translation::batch`: Concurrent batch scheduling
 *   - `translation::retry`: Backoff policy
 *   - `translation::backend`: Backend capability and chat adapter
 * - `providers`: Chat completion clients and mock backends
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod subtitle_store;
pub mod session;
pub mod translation;
pub mod app_controller;
pub mod language_utils;
pub mod providers;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use subtitle_processor::{SourceCatalog, SubtitleCollection, SubtitleEntry};
pub use subtitle_store::SubtitleStore;
pub use session::{SessionManager, SessionStatus};
pub use translation::{BatchScheduler, PipelineBuilder, RunContext, RunStats, TranslationBackend};
pub use language_utils::{get_language_name, validate_language_code};
pub use errors::{AppError, ProviderError, TranslationError};
