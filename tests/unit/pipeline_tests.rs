/*!
 * Tests for the per-request handler chain
 */

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;

use lingobatch::providers::mock::MockBackend;
use lingobatch::session::{Outcome, TranslationJournal};
use lingobatch::translation::{
    PipelineBuilder, RecordingSleeper, RequestStatus, RetryPolicy, RunContext, TranslationRequest,
};
use crate::common;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        jitter_max: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

/// Test that a request recovering on its third attempt is stored and logged per attempt
#[tokio::test]
async fn test_process_withIntermittentBackend_shouldRetryWithBackoff() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let session = common::open_session(&source, &temp_dir.path().join("out"), &["en", "ja"]).await?;
    let backend = MockBackend::fail_first(2);
    let sleeper = Arc::new(RecordingSleeper::new());

    let pipeline = PipelineBuilder::new()
        .add_validation()
        .add_execution(Arc::new(backend.clone()), fast_policy(3), sleeper.clone(), None)
        .add_persistence(session.state(), None)
        .add_logging(session.journal())
        .build()?;

    let ctx = RunContext::new();
    let mut request = TranslationRequest::new(1, "안녕하세요", "", ["en", "ja"]);
    pipeline.process(&mut request, &ctx).await;

    assert_eq!(request.status(), RequestStatus::Succeeded);
    assert_eq!(request.attempt(), 3);
    assert_eq!(backend.calls(), 3);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(1000), Duration::from_millis(2000)]);

    let state = session.state();
    {
        let state = state.lock();
        assert!(state.progress.is_done(1));
        assert_eq!(state.store.get("ja", 1), Some("[ja] 안녕하세요"));
    }

    let records = TranslationJournal::read_all(session.log_path())?;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].outcome, Outcome::Failed);
    assert!(!records[0].is_final);
    assert_eq!(records[2].outcome, Outcome::Success);
    assert!(records[2].is_final);

    Ok(())
}

/// Test that a response missing a language never reaches the store
#[tokio::test]
async fn test_process_withIncompleteResponses_shouldFailWithoutStoring() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let session = common::open_session(&source, &temp_dir.path().join("out"), &["en", "ja"]).await?;
    let backend = MockBackend::new(lingobatch::providers::mock::MockBehavior::Incomplete);

    let pipeline = PipelineBuilder::new()
        .add_validation()
        .add_execution(Arc::new(backend.clone()), fast_policy(2), Arc::new(RecordingSleeper::new()), None)
        .add_persistence(session.state(), None)
        .add_logging(session.journal())
        .build()?;

    let mut request = TranslationRequest::new(2, "반갑습니다", "", ["en", "ja"]);
    pipeline.process(&mut request, &RunContext::new()).await;

    assert_eq!(request.status(), RequestStatus::Failed);
    assert!(request.last_error().unwrap_or_default().contains("ja"));
    assert_eq!(backend.calls(), 2);

    let state = session.state();
    let state = state.lock();
    assert!(!state.progress.is_done(2));
    assert_eq!(state.store.get("en", 2), None);

    Ok(())
}

/// Test that an attempt exceeding the timeout counts as a transient failure
#[tokio::test]
async fn test_process_withSlowBackend_shouldTimeOut() -> Result<()> {
    let backend = MockBackend::slow(500);
    let policy = RetryPolicy {
        attempt_timeout: Duration::from_millis(20),
        ..fast_policy(1)
    };

    let pipeline = PipelineBuilder::new()
        .add_execution(Arc::new(backend), policy, Arc::new(RecordingSleeper::new()), None)
        .build()?;

    let mut request = TranslationRequest::new(1, "하나", "", ["en"]);
    pipeline.process(&mut request, &RunContext::new()).await;

    assert_eq!(request.status(), RequestStatus::Failed);
    assert!(request.last_error().unwrap_or_default().contains("timed out"));

    Ok(())
}

/// Test that a chain without execution still leaves the request terminal
#[tokio::test]
async fn test_process_withoutExecutionStage_shouldMarkRequestFailed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let session = common::open_session(&source, &temp_dir.path().join("out"), &["en"]).await?;

    let pipeline = PipelineBuilder::new()
        .add_validation()
        .add_logging(session.journal())
        .build()?;

    let mut request = TranslationRequest::new(3, "잘 가요", "", ["en"]);
    pipeline.process(&mut request, &RunContext::new()).await;

    assert_eq!(request.status(), RequestStatus::Failed);
    let records = TranslationJournal::read_all(session.log_path())?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error.as_deref(), Some("pipeline: no stage produced a result"));

    Ok(())
}

/// Test that duplicate target languages are requested once
#[test]
fn test_translationRequest_withDuplicateLanguages_shouldDeduplicate() {
    let request = TranslationRequest::new(1, "하나", "", ["en", "ja", "en"]);
    assert_eq!(request.target_langs, vec!["en", "ja"]);
    assert_eq!(request.status(), RequestStatus::Pending);
}
