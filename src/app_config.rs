use std::path::Path;
use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::language_utils::{dedup_language_codes, validate_language_code};
use crate::providers::openai::{GROQ_ENDPOINT, LMSTUDIO_ENDPOINT, OPENAI_ENDPOINT};
use crate::session::SessionFiles;
use crate::translation::backend::{DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT};
use crate::translation::{RetryPolicy, SchedulerConfig};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language codes, one output file each
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<String>,

    /// Neighbouring lines on each side sent as context
    #[serde(default = "default_context_size")]
    pub context_size: usize,

    /// Translation backend
    #[serde(default)]
    pub backend: BackendConfig,

    /// Worker pool and checkpoint cadence
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Retry and timeout settings
    #[serde(default)]
    pub retry: RetrySettings,

    /// Output and bookkeeping files
    #[serde(default)]
    pub persistence: PersistenceSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Groq (OpenAI-compatible)
    #[default]
    Groq,
    // @provider: OpenAI
    OpenAI,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
    // @provider: Scripted offline backend
    Mock,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Groq => "Groq",
            Self::OpenAI => "OpenAI",
            Self::LMStudio => "LM Studio",
            Self::Mock => "Mock",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Groq => "groq".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }

    // @returns: Whether calls need an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Groq | Self::OpenAI)
    }

    // @returns: Default API base URL
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Groq => GROQ_ENDPOINT,
            Self::OpenAI => OPENAI_ENDPOINT,
            Self::LMStudio => LMSTUDIO_ENDPOINT,
            Self::Mock => "",
        }
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAI),
            "lmstudio" => Ok(Self::LMStudio),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Backend configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    // @field: Provider type
    #[serde(default)]
    pub provider: TranslationProvider,

    // @field: Model priority list
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    // @field: Index of the model to use in `models`
    #[serde(default)]
    pub model_index: usize,

    // @field: API key, usually supplied through the environment
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL, empty for the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: HTTP timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// System prompt sent with every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// User prompt template
    /// Placeholders: {target_langs}, {context}, {text}
    #[serde(default = "default_user_prompt")]
    pub user_prompt: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            models: default_models(),
            model_index: 0,
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            user_prompt: default_user_prompt(),
        }
    }
}

impl BackendConfig {
    /// Model at `model_index`; an out-of-range index falls back to the first
    pub fn get_model(&self) -> String {
        match self.models.get(self.model_index) {
            Some(model) => model.clone(),
            None => {
                warn!(
                    "Model index {} is out of range ({} models), using the first model",
                    self.model_index,
                    self.models.len()
                );
                self.models.first().cloned().unwrap_or_default()
            }
        }
    }

    /// Configured endpoint or the provider default
    pub fn get_endpoint(&self) -> String {
        if self.endpoint.is_empty() {
            self.provider.default_endpoint().to_string()
        } else {
            self.endpoint.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Scheduler settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SchedulerSettings {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_save_interval")]
    pub save_interval: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            batch_size: default_batch_size(),
            save_interval: default_save_interval(),
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        SchedulerConfig {
            worker_count: settings.worker_count,
            batch_size: settings.batch_size,
            save_interval: settings.save_interval,
        }
    }
}

/// Retry settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetrySettings {
    /// Attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff, doubled on each retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter_ms: default_jitter_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy {
            max_attempts: settings.max_attempts,
            backoff_base: Duration::from_millis(settings.backoff_base_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            jitter_max: Duration::from_millis(settings.jitter_ms),
            attempt_timeout: Duration::from_secs(settings.attempt_timeout_secs),
        }
    }
}

/// Output settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PersistenceSettings {
    /// Output directory; empty means `<source stem>_translations` next to the source
    #[serde(default = "String::new")]
    pub output_dir: String,
    #[serde(default = "default_progress_file")]
    pub progress_file: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Text written for lines that failed, if any
    #[serde(default)]
    pub failure_placeholder: Option<String>,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            output_dir: String::new(),
            progress_file: default_progress_file(),
            log_file: default_log_file(),
            state_file: default_state_file(),
            failure_placeholder: None,
        }
    }
}

impl PersistenceSettings {
    pub fn session_files(&self) -> SessionFiles {
        SessionFiles {
            progress_file: self.progress_file.clone(),
            log_file: self.log_file.clone(),
            state_file: self.state_file.clone(),
            ..SessionFiles::default()
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "ko".to_string()
}

fn default_target_languages() -> Vec<String> {
    vec!["en".to_string(), "de".to_string()]
}

fn default_context_size() -> usize {
    2
}

fn default_models() -> Vec<String> {
    [
        "openai/gpt-oss-20b",
        "qwen/qwen3-32b",
        "gemma2-9b-it",
        "llama-3.3-70b-versatile",
        "meta-llama/llama-4-maverick-17b-128e-instruct",
        "moonshotai/kimi-k2-instruct",
        "openai/gpt-oss-120b",
        "deepseek-r1-distill-llama-70b",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.3
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_user_prompt() -> String {
    DEFAULT_USER_PROMPT.to_string()
}

fn default_worker_count() -> usize {
    6
}

fn default_batch_size() -> usize {
    12
}

fn default_save_interval() -> usize {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_jitter_ms() -> u64 {
    250
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

fn default_progress_file() -> String {
    "translation_progress.txt".to_string()
}

fn default_log_file() -> String {
    "translation_log.jsonl".to_string()
}

fn default_state_file() -> String {
    "translation_state.json".to_string()
}

impl Config {
    /// Load the config file, creating it with defaults when missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if FileManager::file_exists(path) {
            let content = FileManager::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        FileManager::write_to_file(path, &config_json)?;
        Ok(config)
    }

    /// Target languages, canonicalized and de-duplicated
    pub fn languages(&self) -> Vec<String> {
        dedup_language_codes(&self.target_languages)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: String| Err(AppError::Configuration(msg));

        // Validate languages
        if let Err(e) = validate_language_code(&self.source_language) {
            return invalid(format!("source language: {}", e));
        }
        let languages = self.languages();
        if languages.is_empty() {
            return invalid("at least one target language is required".to_string());
        }
        for lang in &languages {
            if let Err(e) = validate_language_code(lang) {
                return invalid(format!("target language: {}", e));
            }
        }

        // Validate numeric settings
        if self.scheduler.worker_count == 0 {
            return invalid("worker_count must be positive".to_string());
        }
        if self.scheduler.batch_size == 0 {
            return invalid("batch_size must be positive".to_string());
        }
        if self.scheduler.save_interval == 0 {
            return invalid("save_interval must be positive".to_string());
        }
        if self.retry.max_attempts == 0 {
            return invalid("max_attempts must be positive".to_string());
        }
        if self.retry.attempt_timeout_secs == 0 {
            return invalid("attempt_timeout_secs must be positive".to_string());
        }
        if self.retry.max_backoff_ms < self.retry.backoff_base_ms {
            return invalid("max_backoff_ms must not be lower than backoff_base_ms".to_string());
        }

        // Validate backend
        let provider = self.backend.provider;
        if provider != TranslationProvider::Mock {
            if self.backend.models.is_empty() {
                return invalid("at least one model is required".to_string());
            }
            let endpoint = self.backend.get_endpoint();
            if let Err(e) = url::Url::parse(&endpoint) {
                return invalid(format!("invalid endpoint {:?}: {}", endpoint, e));
            }
        }
        if provider.requires_api_key() && self.backend.api_key.trim().is_empty() {
            return invalid(format!(
                "an API key is required for the {} provider",
                provider.display_name()
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_languages: default_target_languages(),
            context_size: default_context_size(),
            backend: BackendConfig::default(),
            scheduler: SchedulerSettings::default(),
            retry: RetrySettings::default(),
            persistence: PersistenceSettings::default(),
            log_level: LogLevel::default(),
        }
    }
}
