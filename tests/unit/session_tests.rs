/*!
 * Tests for the progress index, the translation log and checkpoints
 */

use std::fs;
use anyhow::Result;

use lingobatch::session::{LogRecord, Outcome, ProgressIndex, RunMetadata, TranslationJournal};
use lingobatch::translation::TokenUsage;
use crate::common;

/// Test that the progress file skips garbage lines
#[test]
fn test_progressIndex_parse_withInvalidLines_shouldKeepValidIndices() {
    let progress = ProgressIndex::parse("3\n\nabc\n1\n-2\n3\n");

    assert_eq!(progress.iter().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(progress.render(), "1\n3\n");
}

/// Test that pending indices keep the source order
#[test]
fn test_progressIndex_pending_shouldExcludeCompleted() {
    let mut progress = ProgressIndex::new();
    progress.mark_done(2);

    assert_eq!(progress.pending(&[1, 2, 3]), vec![1, 3]);
}

/// Test that the latest record of an index decides whether it failed
#[test]
fn test_failedIndices_shouldUseLatestRecordPerIndex() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("translation_log.jsonl");
    let journal = TranslationJournal::open(&path)?;

    journal.append(&[LogRecord::new("run-1", 1, 1, Outcome::Failed)])?;
    journal.append(&[LogRecord::new("run-1", 2, 1, Outcome::Failed)])?;
    journal.append(&[LogRecord::new("run-2", 1, 1, Outcome::Success)])?;

    assert_eq!(TranslationJournal::failed_indices(&path)?, vec![2]);

    Ok(())
}

/// Test that a torn last line does not make the log unreadable
#[test]
fn test_readAll_withMalformedLine_shouldSkipIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("translation_log.jsonl");
    let record = LogRecord::new("run-1", 4, 2, Outcome::Success).to_json_line()?;
    fs::write(&path, format!("{}\n{{\"run_id\": \"run-1\", \"ind", record))?;

    let records = TranslationJournal::read_all(&path)?;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].index, 4);
    assert_eq!(records[0].attempt, 2);

    Ok(())
}

/// Test the JSON shape of a log record
#[test]
fn test_logRecord_toJsonLine_shouldUseFinalKey() -> Result<()> {
    let mut record = LogRecord::new("run-1", 7, 3, Outcome::Failed);
    record.is_final = true;
    record.error = Some("execution: 3 attempts exhausted".to_string());

    let value: serde_json::Value = serde_json::from_str(&record.to_json_line()?)?;

    assert_eq!(value["final"], true);
    assert_eq!(value["outcome"], "failed");
    assert_eq!(value["index"], 7);

    Ok(())
}

/// Test that a checkpoint writes language files, progress and run state
#[tokio::test]
async fn test_checkpoint_shouldWriteAllFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_sample_subtitle(temp_dir.path())?;
    let output_dir = temp_dir.path().join("out");
    let session = common::open_session(&source, &output_dir, &["en", "de"]).await?;

    {
        let state = session.state();
        let mut state = state.lock();
        state.store.write("en", 2, "Nice to meet you");
        state.store.write("de", 2, "Freut mich");
        state.progress.mark_done(2);
    }
    session.checkpoint("run-1", TokenUsage::new(12, 6))?;

    assert_eq!(fs::read_to_string(session.progress_path())?, "2\n");
    assert!(fs::read_to_string(session.output_path("de"))?.contains("Freut mich"));

    let meta: RunMetadata = serde_json::from_str(&fs::read_to_string(session.state_path())?)?;
    assert_eq!(meta.completed, 1);
    assert_eq!(meta.total, 3);
    assert_eq!(meta.input_tokens, 12);
    assert_eq!(meta.last_run_id, "run-1");
    assert_eq!(meta.target_languages, vec!["en", "de"]);
    assert_eq!(meta.source_hash.len(), 64);

    Ok(())
}
