/*!
 * Tests for application configuration
 */

use std::time::Duration;
use anyhow::Result;

use lingobatch::app_config::{Config, LogLevel, TranslationProvider};
use lingobatch::errors::AppError;
use lingobatch::translation::{RetryPolicy, SchedulerConfig};
use crate::common;

/// Test that a config file written by load_or_create is valid JSON with every section
#[test]
fn test_loadOrCreate_withMissingFile_shouldCreateDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;

    assert_eq!(config, Config::default());
    assert_eq!(written["backend"]["provider"], "groq");
    assert_eq!(written["scheduler"]["worker_count"], 6);
    assert_eq!(written["retry"]["max_attempts"], 3);
    Ok(())
}

/// Test that an existing file is read and missing fields take defaults
#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{ "target_languages": ["ja"], "scheduler": { "worker_count": 2 }, "log_level": "debug" }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.languages(), vec!["ja"]);
    assert_eq!(config.scheduler.worker_count, 2);
    assert_eq!(config.scheduler.batch_size, 12);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
    Ok(())
}

/// Test that broken JSON is an error rather than silently replaced
#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

/// Test the conversions into engine settings
#[test]
fn test_settings_shouldConvertIntoEngineTypes() {
    let mut config = Config::default();
    config.retry.max_attempts = 5;
    config.retry.backoff_base_ms = 200;
    config.scheduler.save_interval = 7;

    let policy = RetryPolicy::from(&config.retry);
    let scheduler = SchedulerConfig::from(&config.scheduler);

    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.backoff_base, Duration::from_millis(200));
    assert_eq!(policy.attempt_timeout, Duration::from_secs(60));
    assert_eq!(scheduler.save_interval, 7);
    assert_eq!(config.persistence.session_files().progress_file, "translation_progress.txt");
}

/// Test that validation rejects an unknown language and a missing key
#[test]
fn test_validate_shouldReportConfigurationErrors() {
    let mut config = common::mock_config(&["en", "klingon"]);
    assert!(matches!(config.validate(), Err(AppError::Configuration(_))));

    config.target_languages = vec!["en".to_string(), "zh-TW".to_string()];
    assert!(config.validate().is_ok());

    config.backend.provider = TranslationProvider::OpenAI;
    assert!(matches!(config.validate(), Err(AppError::Configuration(_))));

    config.backend.api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());
    assert_eq!(config.backend.get_endpoint(), "https://api.openai.com/v1");
}

/// Test that an empty target list is rejected
#[test]
fn test_validate_withNoTargetLanguages_shouldFail() {
    let config = common::mock_config(&[]);
    assert!(config.validate().is_err());
}

/// Test provider names
#[test]
fn test_translationProvider_names() {
    assert_eq!(TranslationProvider::LMStudio.display_name(), "LM Studio");
    assert_eq!(TranslationProvider::LMStudio.to_string(), "lmstudio");
    assert!(!TranslationProvider::LMStudio.requires_api_key());
    assert!(TranslationProvider::Groq.requires_api_key());
}
