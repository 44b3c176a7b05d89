/*!
 * Integration tests for manual retry and status reporting
 */

use std::fs;
use std::sync::Arc;
use anyhow::Result;

use lingobatch::errors::AppError;
use lingobatch::providers::mock::MockBackend;
use lingobatch::session::{Outcome, TranslationJournal};
use lingobatch::translation::RunContext;
use crate::common;

/// Test that retry-failed re-runs exactly the entries that failed
#[tokio::test]
async fn test_retryFailed_shouldOnlyRetranslateFailedEntries() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");
    let config = common::mock_config(&["en", "ja"]);

    let failing = MockBackend::working().with_failing_texts(["반갑습니다"]);
    let first = common::mock_controller(config.clone(), &failing)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;
    assert_eq!(first.failed_indices, vec![2]);

    let working = MockBackend::working();
    let stats = common::mock_controller(config, &working)?
        .retry_failed(&source, Some(&output_dir), None, Arc::new(RunContext::new()))
        .await?;

    assert_eq!(stats.total_pending, 1);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(working.calls(), 1);
    assert_eq!(working.calls_for("반갑습니다"), 1);
    assert_eq!(fs::read_to_string(output_dir.join("translation_progress.txt"))?, "1\n2\n3\n");

    let records = TranslationJournal::read_all(output_dir.join("translation_log.jsonl"))?;
    let latest = TranslationJournal::latest_outcomes(&records);
    assert!(latest.values().all(|outcome| *outcome == Outcome::Success));

    Ok(())
}

/// Test that the attempt override bounds the backend calls of a retry
#[tokio::test]
async fn test_retryFailed_withMaxAttemptsOverride_shouldUseIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");
    let config = common::mock_config(&["en"]);

    let failing = MockBackend::working().with_failing_texts(["잘 가요"]);
    common::mock_controller(config.clone(), &failing)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    let still_failing = MockBackend::working().with_failing_texts(["잘 가요"]);
    let stats = common::mock_controller(config, &still_failing)?
        .retry_failed(&source, Some(&output_dir), Some(5), Arc::new(RunContext::new()))
        .await?;

    assert_eq!(stats.failed_indices, vec![3]);
    assert_eq!(still_failing.calls_for("잘 가요"), 5);

    Ok(())
}

/// Test that retry-failed without failures does nothing
#[tokio::test]
async fn test_retryFailed_withoutFailures_shouldNotCallBackend() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");
    let config = common::mock_config(&["en"]);

    common::mock_controller(config.clone(), &MockBackend::working())?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    let backend = MockBackend::working();
    let stats = common::mock_controller(config, &backend)?
        .retry_failed(&source, Some(&output_dir), None, Arc::new(RunContext::new()))
        .await?;

    assert_eq!(stats.total_pending, 0);
    assert_eq!(backend.calls(), 0);

    Ok(())
}

/// Test that a zero attempt override is rejected
#[tokio::test]
async fn test_retryFailed_withZeroAttempts_shouldBeConfigurationError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let backend = MockBackend::working();

    let result = common::mock_controller(common::mock_config(&["en"]), &backend)?
        .retry_failed(&source, Some(&temp_dir.path().join("out")), Some(0), Arc::new(RunContext::new()))
        .await;

    assert!(matches!(result, Err(AppError::Configuration(_))));

    Ok(())
}

/// Test that status reports counts, failures and token totals
#[tokio::test]
async fn test_status_afterPartialRun_shouldReportProgress() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");
    let config = common::mock_config(&["en", "ja"]);

    let failing = MockBackend::working().with_failing_texts(["반갑습니다"]);
    let controller = common::mock_controller(config, &failing)?;
    let stats = controller
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    let status = controller.status(&source, Some(&output_dir)).await?;

    assert_eq!(status.total, 3);
    assert_eq!(status.completed, 2);
    assert_eq!(status.pending, 1);
    assert_eq!(status.failed, vec![2]);
    assert_eq!(status.input_tokens, stats.input_tokens);
    assert_eq!(status.output_tokens, stats.output_tokens);
    assert!(status.last_run_id.is_some());
    assert!(status.to_string().starts_with("2/3 completed"));

    Ok(())
}
