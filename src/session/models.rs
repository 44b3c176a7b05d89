/*!
 * Records persisted by a translation session.
 *
 * - `LogRecord`: one line of the translation log (JSON Lines)
 * - `RunMetadata`: the run state file rewritten at every checkpoint
 * - `SessionStatus`: counts reported by the `status` command
 */

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Outcome of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
}

/// One translation log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Run that produced the record
    pub run_id: String,
    /// Source index
    pub index: usize,
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub outcome: Outcome,
    /// Attempt number, 0 when the backend was never called
    pub attempt: u32,
    /// Last record written for the request in this run
    #[serde(rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogRecord {
    /// Create a record stamped with the current time
    pub fn new(run_id: &str, index: usize, attempt: u32, outcome: Outcome) -> Self {
        Self {
            run_id: run_id.to_string(),
            index,
            timestamp: Utc::now().to_rfc3339(),
            outcome,
            attempt,
            is_final: false,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            error: None,
        }
    }

    /// Serialize as a single JSON line without the trailing newline
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Run state file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Source subtitle file
    pub source_file: String,
    /// SHA-256 of the source file
    pub source_hash: String,
    /// Target languages covered by the outputs
    pub target_languages: Vec<String>,
    /// Model used by the last run
    #[serde(default)]
    pub model: String,
    /// Indices completed so far
    #[serde(default)]
    pub completed: usize,
    /// Total source entries
    #[serde(default)]
    pub total: usize,
    /// Cumulative token usage over all runs
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    /// Id of the last run that checkpointed
    #[serde(default)]
    pub last_run_id: String,
    /// RFC 3339 time of the last checkpoint
    #[serde(default)]
    pub updated_at: String,
}

impl RunMetadata {
    /// Whether the stored run can be resumed for the given source and languages
    pub fn is_compatible(&self, source_hash: &str, languages: &[String]) -> bool {
        self.source_hash == source_hash
            && languages.iter().all(|lang| self.target_languages.contains(lang))
    }

    /// Stored languages followed by any of `languages` not yet among them
    pub fn covering(&self, languages: &[String]) -> Vec<String> {
        let mut covered = self.target_languages.clone();
        for lang in languages {
            if !covered.contains(lang) {
                covered.push(lang.clone());
            }
        }
        covered
    }
}

/// Snapshot of a session's progress
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Indices whose latest log record failed and are not completed
    pub failed: Vec<usize>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub last_run_id: Option<String>,
}

impl SessionStatus {
    /// Calculate completion percentage
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} completed ({:.1}%), {} pending, {} failed, tokens: {} in / {} out",
            self.completed,
            self.total,
            self.completion_percentage(),
            self.pending,
            self.failed.len(),
            self.input_tokens,
            self.output_tokens
        )
    }
}
