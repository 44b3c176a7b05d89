// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use log::{info, warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use clap::{Args, Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use lingobatch::app_config::{self, Config, TranslationProvider};
use lingobatch::app_controller::Controller;
use lingobatch::language_utils::parse_language_list;
use lingobatch::translation::{RunContext, RunStats};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Groq,
    OpenAI,
    LMStudio,
    Mock,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Groq => TranslationProvider::Groq,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
            CliTranslationProvider::Mock => TranslationProvider::Mock,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a subtitle file, resuming earlier progress (default command)
    Translate(TranslateArgs),

    /// Translate again the entries that failed in earlier runs
    RetryFailed(TranslateArgs),

    /// Show completed, pending and failed entries of a translation
    Status(TranslateArgs),

    /// Generate shell completions for lingobatch
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Source SRT file
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

/// Options overriding the configuration file
#[derive(Args, Debug, Clone, Default)]
struct ConfigOverrides {
    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'ko', 'ja')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Comma separated target language codes (e.g., 'en,de,ja')
    #[arg(short, long)]
    target_languages: Option<String>,

    /// Number of concurrent requests
    #[arg(short, long)]
    workers: Option<usize>,

    /// Entries per batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Successful entries between checkpoints
    #[arg(long)]
    save_interval: Option<usize>,

    /// Backend attempts per entry
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Output directory (default: <input stem>_translations)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// API key for remote providers
    #[arg(long, env = "LINGOBATCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// lingobatch - concurrent, resumable subtitle translation
///
/// Translates one SRT file into several languages at once with an
/// OpenAI-compatible chat model, checkpointing progress so interrupted
/// runs continue where they stopped.
#[derive(Parser, Debug)]
#[command(name = "lingobatch")]
#[command(version)]
#[command(about = "Concurrent, resumable multi-language subtitle translation")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "lingobatch translates an SRT file into several target languages concurrently.
Completed entries are checkpointed, so an interrupted run resumes where it stopped.

EXAMPLES:
    lingobatch drama.srt                          # Translate using default config
    lingobatch -t en,de,ja drama.srt              # Choose target languages
    lingobatch -p openai -m gpt-4o-mini drama.srt # Use specific provider and model
    lingobatch retry-failed drama.srt             # Retry entries that failed
    lingobatch status drama.srt                   # Show progress of a translation
    lingobatch completions bash > lingobatch.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. The API key is read from --api-key,
    LINGOBATCH_API_KEY, GROQ_API_KEY or OPENAI_API_KEY.

SUPPORTED PROVIDERS:
    groq     - Groq API (default, requires API key)
    openai   - OpenAI API (requires API key)
    lmstudio - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)
    mock     - Offline dry run answering \"[lang] text\"")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Source SRT file
    #[arg(value_name = "INPUT_FILE")]
    input_file: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "\x1B[1;31m"),
            Level::Warn => ("WARN ", "\x1B[1;33m"),
            Level::Info => ("INFO ", "\x1B[1;32m"),
            Level::Debug => ("DEBUG", "\x1B[1;36m"),
            Level::Trace => ("TRACE", "\x1B[1;35m"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let thread = std::thread::current();
            let (marker, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} [{}] {}\x1B[0m",
                colour,
                now,
                marker,
                thread.name().unwrap_or("worker"),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger with trace so the level can be lowered after loading the config
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "lingobatch", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::RetryFailed(args)) => run_retry_failed(args).await,
        Some(Commands::Status(args)) => run_status(args).await,
        None => {
            // Default behavior - translate with the top-level args
            let input_file = cli.input_file.ok_or_else(|| {
                anyhow!("INPUT_FILE is required when no subcommand is specified")
            })?;
            run_translate(TranslateArgs { input_file, overrides: cli.overrides }).await
        }
    }
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let controller = build_controller(&args.overrides)?;
    let ctx = cancellable_context();
    let stats = controller
        .run(&args.input_file, args.overrides.output_dir.as_deref(), ctx)
        .await?;
    print_summary(&stats);
    Ok(())
}

async fn run_retry_failed(args: TranslateArgs) -> Result<()> {
    let controller = build_controller(&args.overrides)?;
    let ctx = cancellable_context();
    let stats = controller
        .retry_failed(
            &args.input_file,
            args.overrides.output_dir.as_deref(),
            args.overrides.max_attempts,
            ctx,
        )
        .await?;
    print_summary(&stats);
    Ok(())
}

async fn run_status(args: TranslateArgs) -> Result<()> {
    let controller = build_controller(&args.overrides)?;
    let status = controller
        .status(&args.input_file, args.overrides.output_dir.as_deref())
        .await?;
    println!("{}", status);
    Ok(())
}

/// Load the configuration, apply CLI overrides and create the controller
fn build_controller(overrides: &ConfigOverrides) -> Result<Controller> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &overrides.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&overrides.config_path)?;
    apply_overrides(&mut config, overrides);

    if overrides.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    // Validate the configuration after loading and overriding
    let controller = Controller::with_config(config)?;
    Ok(controller)
}

fn apply_overrides(config: &mut Config, overrides: &ConfigOverrides) {
    if let Some(provider) = &overrides.provider {
        config.backend.provider = provider.clone().into();
    }
    if let Some(model) = &overrides.model {
        // Put the requested model first in the priority list and select it
        config.backend.models.retain(|m| m != model);
        config.backend.models.insert(0, model.clone());
        config.backend.model_index = 0;
    }
    if let Some(source_lang) = &overrides.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_langs) = &overrides.target_languages {
        config.target_languages = parse_language_list(target_langs);
    }
    if let Some(workers) = overrides.workers {
        config.scheduler.worker_count = workers;
    }
    if let Some(batch_size) = overrides.batch_size {
        config.scheduler.batch_size = batch_size;
    }
    if let Some(save_interval) = overrides.save_interval {
        config.scheduler.save_interval = save_interval;
    }
    if let Some(max_attempts) = overrides.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(output_dir) = &overrides.output_dir {
        config.persistence.output_dir = output_dir.to_string_lossy().to_string();
    }
    if let Some(log_level) = &overrides.log_level {
        config.log_level = log_level.clone().into();
    }

    if let Some(api_key) = &overrides.api_key {
        config.backend.api_key = api_key.clone();
    } else if config.backend.api_key.is_empty() {
        let fallback = match config.backend.provider {
            TranslationProvider::Groq => std::env::var("GROQ_API_KEY").ok(),
            TranslationProvider::OpenAI => std::env::var("OPENAI_API_KEY").ok(),
            _ => None,
        };
        if let Some(api_key) = fallback {
            config.backend.api_key = api_key;
        }
    }
}

/// Run context cancelled by Ctrl-C
fn cancellable_context() -> Arc<RunContext> {
    let ctx = Arc::new(RunContext::new());
    let signal_ctx = Arc::clone(&ctx);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight entries before stopping...");
            signal_ctx.cancel();
        }
    });
    ctx
}

fn print_summary(stats: &RunStats) {
    if stats.total_pending == 0 {
        info!("Nothing to do");
        return;
    }
    println!("{}", stats);
    if stats.interrupted {
        info!("Run again with the same arguments to continue");
    }
}
