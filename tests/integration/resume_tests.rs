/*!
 * Integration tests for interrupted runs and resume
 */

use std::fs;
use std::sync::Arc;
use anyhow::Result;

use lingobatch::providers::mock::MockBackend;
use lingobatch::subtitle_processor::SubtitleCollection;
use lingobatch::translation::{RunContext, TokenUsage};
use crate::common;

/// Test that a restart after a checkpoint of entry 1 only translates the rest
#[tokio::test]
async fn test_run_afterCrash_shouldOnlyScheduleUnfinishedEntries() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");

    // State left behind by a run that died after its first checkpoint
    {
        let session = common::open_session(&source, &output_dir, &["en", "ja"]).await?;
        let state = session.state();
        {
            let mut state = state.lock();
            state.store.write("en", 1, "Hello");
            state.store.write("ja", 1, "こんにちは");
            state.progress.mark_done(1);
        }
        session.checkpoint("crashed-run", TokenUsage::new(40, 20))?;
    }

    let backend = MockBackend::working();
    let stats = common::mock_controller(common::mock_config(&["en", "ja"]), &backend)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    assert_eq!(stats.total_pending, 2);
    assert_eq!(backend.calls(), 2);
    assert_eq!(backend.calls_for("안녕하세요"), 0);
    assert_eq!(fs::read_to_string(output_dir.join("translation_progress.txt"))?, "1\n2\n3\n");

    let english = SubtitleCollection::load_srt(output_dir.join("en.srt"))?;
    assert_eq!(english.entries[0].text, "Hello");
    assert_eq!(english.entries[1].text, "[en] 반갑습니다");

    let session = common::open_session(&source, &output_dir, &["en", "ja"]).await?;
    let status = session.status()?;
    assert_eq!(status.completed, 3);
    assert_eq!(status.input_tokens, 40 + 20);

    Ok(())
}

/// Test that a cancelled run stops dispatching and the next run finishes the work
#[tokio::test]
async fn test_run_whenCancelled_shouldResumeOnNextRun() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");
    let mut config = common::mock_config(&["en"]);
    config.scheduler.batch_size = 1;
    config.scheduler.worker_count = 1;

    let ctx = Arc::new(RunContext::new());
    ctx.cancel();
    let first = MockBackend::working();
    let interrupted = common::mock_controller(config.clone(), &first)?
        .run(&source, Some(&output_dir), ctx)
        .await?;

    assert!(interrupted.interrupted);
    assert_eq!(first.calls(), 0);

    let second = MockBackend::working();
    let stats = common::mock_controller(config, &second)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    assert!(!stats.interrupted);
    assert_eq!(stats.succeeded, 3);
    assert_eq!(second.calls(), 3);

    Ok(())
}

/// Test that adding a target language starts the translation afresh
#[tokio::test]
async fn test_run_withNewTargetLanguage_shouldStartFresh() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");

    let first = MockBackend::working();
    common::mock_controller(common::mock_config(&["en"]), &first)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    let second = MockBackend::working();
    let stats = common::mock_controller(common::mock_config(&["en", "ja"]), &second)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    assert_eq!(stats.total_pending, 3);
    assert_eq!(second.calls(), 3);
    let japanese = SubtitleCollection::load_srt(output_dir.join("ja.srt"))?;
    assert_eq!(japanese.entries.len(), 3);

    Ok(())
}

/// Test that dropping a target language keeps earlier progress
#[tokio::test]
async fn test_run_withFewerTargetLanguages_shouldResume() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");

    let first = MockBackend::working();
    common::mock_controller(common::mock_config(&["en", "ja"]), &first)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    let second = MockBackend::working();
    let stats = common::mock_controller(common::mock_config(&["ja"]), &second)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    assert_eq!(stats.total_pending, 0);
    assert_eq!(second.calls(), 0);

    Ok(())
}

/// Test that a run over fewer languages does not invalidate the full language set
#[tokio::test]
async fn test_run_afterFewerLanguagesRun_shouldOnlyFillMissingLanguages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");

    let first = MockBackend::working().with_failing_texts(["반갑습니다"]);
    common::mock_controller(common::mock_config(&["en", "ja"]), &first)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;
    assert_eq!(first.calls(), 5);

    let second = MockBackend::working();
    let japanese_only = common::mock_controller(common::mock_config(&["ja"]), &second)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;
    assert_eq!(japanese_only.total_pending, 1);
    assert_eq!(second.calls(), 1);

    let third = MockBackend::working();
    let stats = common::mock_controller(common::mock_config(&["en", "ja"]), &third)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    assert_eq!(stats.total_pending, 1);
    assert_eq!(third.calls(), 1);
    assert_eq!(third.calls_for("반갑습니다"), 1);
    assert_eq!(third.calls_for("안녕하세요"), 0);

    let english = SubtitleCollection::load_srt(output_dir.join("en.srt"))?;
    assert_eq!(english.indices(), vec![1, 2, 3]);
    assert_eq!(fs::read_to_string(output_dir.join("translation_progress.txt"))?, "1\n2\n3\n");

    Ok(())
}

/// Test that an edited source file invalidates earlier progress
#[tokio::test]
async fn test_run_withChangedSource_shouldStartFresh() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");
    let config = common::mock_config(&["en"]);

    let first = MockBackend::working();
    common::mock_controller(config.clone(), &first)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    common::create_test_subtitle(temp_dir.path(), "episode.srt", &["안녕", "반가워", "또 봐"])?;

    let second = MockBackend::working();
    let stats = common::mock_controller(config, &second)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    assert_eq!(stats.total_pending, 3);
    assert_eq!(second.calls_for("안녕"), 1);
    let english = SubtitleCollection::load_srt(output_dir.join("en.srt"))?;
    assert_eq!(english.entries[0].text, "[en] 안녕");

    Ok(())
}

/// Test that entries whose output lines were lost are translated again
#[tokio::test]
async fn test_run_withDeletedOutputFile_shouldRetranslateMissingLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");
    let config = common::mock_config(&["en", "ja"]);

    let first = MockBackend::working();
    common::mock_controller(config.clone(), &first)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    fs::remove_file(output_dir.join("ja.srt"))?;

    let second = MockBackend::working();
    let stats = common::mock_controller(config, &second)?
        .run(&source, Some(&output_dir), Arc::new(RunContext::new()))
        .await?;

    assert_eq!(stats.succeeded, 3);
    assert_eq!(second.calls(), 3);
    assert!(output_dir.join("ja.srt").exists());

    Ok(())
}
