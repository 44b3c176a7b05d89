use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};

use crate::app_config::{Config, TranslationProvider};
use crate::errors::AppError;
use crate::providers::mock::MockBackend;
use crate::providers::openai::OpenAI;
use crate::session::{SessionManager, SessionOptions, SessionStatus};
use crate::subtitle_processor::{SourceCatalog, SubtitleCollection};
use crate::translation::{
    BatchScheduler, ChatBackend, PipelineBuilder, PromptTemplate, RetryPolicy, RunContext, RunStats,
    SchedulerConfig, Sleeper, TokioSleeper, TranslationBackend, TranslationPipeline,
};

// @module: Application controller for batch subtitle translation

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Backend override, built from the config when absent
    backend: Option<Arc<dyn TranslationBackend>>,
    // @field: Backoff sleeper
    sleeper: Arc<dyn Sleeper>,
    // @field: Render an indicatif progress bar
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            config,
            backend: None,
            sleeper: Arc::new(TokioSleeper),
            show_progress: true,
        })
    }

    /// Use `backend` instead of the configured provider
    pub fn with_backend(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use `sleeper` for retry backoff
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output directory for `input`: the override, the configured directory,
    /// or `<stem>_translations` next to the source file
    pub fn resolve_output_dir(&self, input_file: &Path, output_dir: Option<&Path>) -> PathBuf {
        if let Some(dir) = output_dir {
            return dir.to_path_buf();
        }
        if !self.config.persistence.output_dir.is_empty() {
            return PathBuf::from(&self.config.persistence.output_dir);
        }
        let stem = input_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "subtitles".to_string());
        input_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("{}_translations", stem))
    }

    /// Translate every entry of `input_file` not yet completed
    pub async fn run(
        &self,
        input_file: &Path,
        output_dir: Option<&Path>,
        ctx: Arc<RunContext>,
    ) -> Result<RunStats, AppError> {
        let (source, session) = self.open_session(input_file, output_dir).await?;
        let pending = session.pending_indices();
        if pending.is_empty() {
            info!("All {} entries are already translated", source.entries.len());
        }

        let policy = RetryPolicy::from(&self.config.retry);
        self.execute(&source, session, pending, policy, ctx).await
    }

    /// Re-run the entries whose latest log record failed.
    ///
    /// `max_attempts` overrides the configured retry bound for this run.
    pub async fn retry_failed(
        &self,
        input_file: &Path,
        output_dir: Option<&Path>,
        max_attempts: Option<u32>,
        ctx: Arc<RunContext>,
    ) -> Result<RunStats, AppError> {
        let (source, session) = self.open_session(input_file, output_dir).await?;
        let failed = session
            .failed_indices()
            .map_err(|e| AppError::Persistence(format!("{:#}", e)))?;

        if failed.is_empty() {
            info!("No failed entries to retry");
        } else {
            info!("Retrying {} failed entries", failed.len());
        }

        let mut policy = RetryPolicy::from(&self.config.retry);
        if let Some(attempts) = max_attempts {
            if attempts == 0 {
                return Err(AppError::Configuration("max_attempts must be positive".to_string()));
            }
            policy.max_attempts = attempts;
        }
        self.execute(&source, session, failed, policy, ctx).await
    }

    /// Progress of the session stored for `input_file`
    pub async fn status(&self, input_file: &Path, output_dir: Option<&Path>) -> Result<SessionStatus, AppError> {
        let (_, session) = self.open_session(input_file, output_dir).await?;
        session.status().map_err(|e| AppError::Persistence(format!("{:#}", e)))
    }

    async fn open_session(
        &self,
        input_file: &Path,
        output_dir: Option<&Path>,
    ) -> Result<(SubtitleCollection, Arc<SessionManager>), AppError> {
        if !input_file.exists() {
            return Err(AppError::File(format!("Input file does not exist: {:?}", input_file)));
        }

        let source = SubtitleCollection::load_srt(input_file)
            .map_err(|e| AppError::File(format!("{:#}", e)))?;
        let output_dir = self.resolve_output_dir(input_file, output_dir);

        let session = SessionManager::open(
            &source,
            SessionOptions {
                output_dir,
                languages: self.config.languages(),
                model: self.model_name(),
                files: self.config.persistence.session_files(),
            },
        )
        .await
        .map_err(|e| AppError::Persistence(format!("{:#}", e)))?;

        Ok((source, Arc::new(session)))
    }

    async fn execute(
        &self,
        source: &SubtitleCollection,
        session: Arc<SessionManager>,
        pending: Vec<usize>,
        policy: RetryPolicy,
        ctx: Arc<RunContext>,
    ) -> Result<RunStats, AppError> {
        let pipeline = self.build_pipeline(&session, policy)?;
        let catalog = Arc::new(SourceCatalog::new(source, self.config.context_size));

        info!(
            "{} - {} ({} -> {})",
            self.config.backend.provider.display_name(),
            self.model_name(),
            self.config.source_language,
            session.languages().join(",")
        );

        let progress_bar = self.progress_bar(pending.len());
        let pb = progress_bar.clone();
        let scheduler = BatchScheduler::new(
            pipeline,
            catalog,
            Arc::clone(&session),
            SchedulerConfig::from(&self.config.scheduler),
        )
        .with_progress_callback(Arc::new(move |processed, _total| {
            pb.set_position(processed as u64);
        }));

        let result = scheduler.run(pending, ctx).await;
        progress_bar.finish_and_clear();

        let stats = result?;
        self.report(&stats, &session);
        Ok(stats)
    }

    fn build_pipeline(&self, session: &SessionManager, policy: RetryPolicy) -> Result<TranslationPipeline, AppError> {
        PipelineBuilder::new()
            .add_validation()
            .add_execution(
                self.backend()?,
                policy,
                Arc::clone(&self.sleeper),
                Some(self.model_name()),
            )
            .add_persistence(session.state(), self.config.persistence.failure_placeholder.clone())
            .add_logging(session.journal())
            .build()
    }

    fn backend(&self) -> Result<Arc<dyn TranslationBackend>, AppError> {
        if let Some(backend) = &self.backend {
            return Ok(Arc::clone(backend));
        }

        let backend_config = &self.config.backend;
        match backend_config.provider {
            TranslationProvider::Mock => Ok(Arc::new(MockBackend::working())),
            provider => {
                if provider.requires_api_key() && backend_config.api_key.is_empty() {
                    return Err(AppError::Configuration(format!(
                        "an API key is required for the {} provider",
                        provider.display_name()
                    )));
                }
                let client = OpenAI::new(
                    backend_config.api_key.clone(),
                    backend_config.get_endpoint(),
                    backend_config.timeout(),
                );
                let prompt = PromptTemplate {
                    system: backend_config.system_prompt.clone(),
                    user: backend_config.user_prompt.clone(),
                };
                Ok(Arc::new(ChatBackend::new(
                    client,
                    backend_config.get_model(),
                    backend_config.temperature,
                    prompt,
                )))
            }
        }
    }

    fn model_name(&self) -> String {
        match self.config.backend.provider {
            TranslationProvider::Mock => "mock".to_string(),
            _ => self.config.backend.get_model(),
        }
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress || total == 0 {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} entries ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("#>-"));
        progress_bar.set_message("Translating");
        progress_bar
    }

    fn report(&self, stats: &RunStats, session: &SessionManager) {
        if stats.total_pending == 0 {
            return;
        }
        info!(
            "Translation {} in {}: {} succeeded, {} failed, {} input / {} output tokens",
            if stats.interrupted { "interrupted" } else { "completed" },
            Self::format_duration(stats.elapsed),
            stats.succeeded,
            stats.failed,
            stats.input_tokens,
            stats.output_tokens
        );
        if stats.failed > 0 {
            warn!(
                "{} entries failed (see {:?}); run `lingobatch retry-failed` to try them again",
                stats.failed,
                session.log_path()
            );
        }
        for lang in session.languages() {
            info!("Output: {}", session.output_path(lang).display());
        }
    }

    // Format duration in a human-readable format (HH:MM:SS)
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
