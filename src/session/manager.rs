/*!
 * Session manager for the on-disk state of a translation run.
 *
 * This module handles:
 * - Locating the output files, progress index, translation log and state file
 * - Resuming from a previous run when the source and languages still match
 * - Writing checkpoints: language files first, then progress, then run state
 */

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::subtitle_processor::SubtitleCollection;
use crate::subtitle_store::SubtitleStore;
use crate::translation::backend::TokenUsage;

use super::journal::TranslationJournal;
use super::models::{RunMetadata, SessionStatus};
use super::progress::ProgressIndex;

/// Subtitle store and progress index, mutated together under one lock
#[derive(Debug)]
pub struct CheckpointState {
    pub store: SubtitleStore,
    pub progress: ProgressIndex,
}

/// Lock shared by the persistence stage and the checkpoint writer
pub type SharedCheckpoint = Arc<Mutex<CheckpointState>>;

/// File names used inside the output directory
#[derive(Debug, Clone)]
pub struct SessionFiles {
    pub progress_file: String,
    pub log_file: String,
    pub state_file: String,
    pub output_extension: String,
}

impl Default for SessionFiles {
    fn default() -> Self {
        Self {
            progress_file: "translation_progress.txt".to_string(),
            log_file: "translation_log.jsonl".to_string(),
            state_file: "translation_state.json".to_string(),
            output_extension: "srt".to_string(),
        }
    }
}

/// Parameters for opening a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Directory receiving `<lang>.srt` and the bookkeeping files
    pub output_dir: PathBuf,
    /// Target languages, already de-duplicated
    pub languages: Vec<String>,
    /// Model recorded in the state file
    pub model: String,
    pub files: SessionFiles,
}

/// Owner of the durable state of one output directory
pub struct SessionManager {
    options: SessionOptions,
    source_file: PathBuf,
    source_hash: String,
    indices: Vec<usize>,
    // @field: Languages with output files in this directory, a superset of `options.languages`
    covered_languages: Vec<String>,
    state: SharedCheckpoint,
    journal: Arc<TranslationJournal>,
    // @field: Token usage of earlier runs
    base_usage: TokenUsage,
}

impl SessionManager {
    /// Open (or start) the session for `source` in `options.output_dir`.
    ///
    /// Progress is kept only when the stored source hash matches and the
    /// stored languages cover the requested ones; otherwise the run starts
    /// fresh. Completed indices whose lines are missing from the output files
    /// are demoted to pending. A run over a subset of the stored languages
    /// keeps the other languages recorded, so a later run over the full set
    /// still resumes.
    pub async fn open(source: &SubtitleCollection, options: SessionOptions) -> Result<Self> {
        FileManager::ensure_dir(&options.output_dir)?;

        let source_hash = Self::hash_file(&source.source_file).await?;
        let state_path = options.output_dir.join(&options.files.state_file);
        let progress_path = options.output_dir.join(&options.files.progress_file);

        let previous = Self::load_metadata(&state_path)?;
        let resumable = match &previous {
            Some(meta) if !meta.is_compatible(&source_hash, &options.languages) => {
                if meta.source_hash != source_hash {
                    warn!("Source file changed since the last run, starting fresh");
                } else {
                    warn!(
                        "Target languages changed ({} -> {}), starting fresh",
                        meta.target_languages.join(","),
                        options.languages.join(",")
                    );
                }
                false
            }
            _ => true,
        };

        let mut store = SubtitleStore::new(source, &options.languages);
        let mut progress = ProgressIndex::new();
        let mut base_usage = TokenUsage::default();
        let mut covered_languages = options.languages.clone();

        if resumable {
            progress = ProgressIndex::load(&progress_path)?;
            for lang in &options.languages {
                let path = FileManager::language_output_path(
                    &options.output_dir,
                    lang,
                    &options.files.output_extension,
                );
                if let Err(e) = store.load_language(lang, &path) {
                    warn!("Could not load existing output {:?}: {:#}", path, e);
                }
            }

            let incomplete = progress.iter().filter(|&i| !store.is_complete(i)).count();
            if incomplete > 0 {
                warn!(
                    "{} completed indices have missing output lines and will be translated again",
                    incomplete
                );
                let mut kept = ProgressIndex::new();
                for index in progress.iter().filter(|&i| store.is_complete(i)) {
                    kept.mark_done(index);
                }
                progress = kept;
            }

            if let Some(meta) = &previous {
                base_usage = TokenUsage::new(meta.input_tokens, meta.output_tokens);
                covered_languages = meta.covering(&options.languages);
            }
            if !progress.is_empty() {
                info!("Resuming: {} of {} entries already translated", progress.len(), source.entries.len());
            }
        }

        let journal = TranslationJournal::open(options.output_dir.join(&options.files.log_file))?;

        debug!("Session opened in {:?} (hash {})", options.output_dir, &source_hash[..8]);

        Ok(Self {
            source_file: source.source_file.clone(),
            source_hash,
            indices: source.indices(),
            covered_languages,
            state: Arc::new(Mutex::new(CheckpointState { store, progress })),
            journal: Arc::new(journal),
            base_usage,
            options,
        })
    }

    pub fn state(&self) -> SharedCheckpoint {
        Arc::clone(&self.state)
    }

    pub fn journal(&self) -> Arc<TranslationJournal> {
        Arc::clone(&self.journal)
    }

    pub fn languages(&self) -> &[String] {
        &self.options.languages
    }

    pub fn output_dir(&self) -> &Path {
        &self.options.output_dir
    }

    pub fn progress_path(&self) -> PathBuf {
        self.options.output_dir.join(&self.options.files.progress_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.options.output_dir.join(&self.options.files.log_file)
    }

    pub fn state_path(&self) -> PathBuf {
        self.options.output_dir.join(&self.options.files.state_file)
    }

    pub fn output_path(&self, language: &str) -> PathBuf {
        FileManager::language_output_path(
            &self.options.output_dir,
            language,
            &self.options.files.output_extension,
        )
    }

    /// Source indices not yet in the progress index, in source order
    pub fn pending_indices(&self) -> Vec<usize> {
        self.state.lock().progress.pending(&self.indices)
    }

    /// Indices whose latest log record failed and that are still pending
    pub fn failed_indices(&self) -> Result<Vec<usize>> {
        let failed = TranslationJournal::failed_indices(self.log_path())?;
        let state = self.state.lock();
        Ok(failed
            .into_iter()
            .filter(|index| self.indices.contains(index) && !state.progress.is_done(*index))
            .collect())
    }

    /// Progress counts and cumulative token usage
    pub fn status(&self) -> Result<SessionStatus> {
        let failed = self.failed_indices()?;
        let completed = self.state.lock().progress.len();
        let meta = Self::load_metadata(&self.state_path())?;

        Ok(SessionStatus {
            total: self.indices.len(),
            completed,
            pending: self.indices.len().saturating_sub(completed),
            failed,
            input_tokens: self.base_usage.input_tokens,
            output_tokens: self.base_usage.output_tokens,
            last_run_id: meta.map(|m| m.last_run_id).filter(|id| !id.is_empty()),
        })
    }

    /// Flush the store, the progress index and the run state to disk.
    ///
    /// The lock is held only while rendering; all file I/O happens on the
    /// snapshot.
    pub fn checkpoint(&self, run_id: &str, run_usage: TokenUsage) -> Result<(), AppError> {
        let (documents, progress) = {
            let state = self.state.lock();
            let documents: Vec<(String, String)> = self
                .options
                .languages
                .iter()
                .map(|lang| (lang.clone(), state.store.render(lang)))
                .collect();
            (documents, state.progress.clone())
        };

        self.write_checkpoint(run_id, run_usage, &documents, &progress)
            .map_err(|e| AppError::Persistence(format!("{:#}", e)))?;

        debug!("Checkpoint written: {} entries complete", progress.len());
        Ok(())
    }

    fn write_checkpoint(
        &self,
        run_id: &str,
        run_usage: TokenUsage,
        documents: &[(String, String)],
        progress: &ProgressIndex,
    ) -> Result<()> {
        for (lang, document) in documents {
            FileManager::write_atomic(self.output_path(lang), document)?;
        }
        progress.save(self.progress_path())?;

        let total_usage = self.base_usage + run_usage;
        let meta = RunMetadata {
            source_file: self.source_file.to_string_lossy().to_string(),
            source_hash: self.source_hash.clone(),
            target_languages: self.covered_languages.clone(),
            model: self.options.model.clone(),
            completed: progress.len(),
            total: self.indices.len(),
            input_tokens: total_usage.input_tokens,
            output_tokens: total_usage.output_tokens,
            last_run_id: run_id.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&meta).context("Failed to serialize run state")?;
        FileManager::write_atomic(self.state_path(), &json)
    }

    fn load_metadata(path: &Path) -> Result<Option<RunMetadata>> {
        if !FileManager::file_exists(path) {
            return Ok(None);
        }
        let content = FileManager::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                warn!("Ignoring unreadable run state {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    /// Compute SHA256 hash of a file
    async fn hash_file(path: &Path) -> Result<String> {
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open file for hashing: {:?}", path))?;

            let mut hasher = Sha256::new();
            let mut buffer = [0u8; 8192];

            loop {
                let bytes_read = file.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
            }

            Ok(format!("{:x}", hasher.finalize()))
        })
        .await
        .context("File hashing task panicked")?
    }
}
