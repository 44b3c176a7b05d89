/*!
 * Append-only translation log in JSON Lines format.
 *
 * Every attempt of every request produces one record. The file is never
 * rewritten; the latest record of an index decides whether it counts as
 * failed for a manual retry.
 */

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::warn;
use parking_lot::Mutex;

use crate::file_utils::FileManager;
use super::models::{LogRecord, Outcome};

/// Shared append handle to the translation log
#[derive(Debug)]
pub struct TranslationJournal {
    path: PathBuf,
    file: Mutex<File>,
}

impl TranslationJournal {
    /// Open the log for appending, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            FileManager::ensure_dir(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open translation log: {:?}", path))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the records of one request in a single write
    pub fn append(&self, records: &[LogRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&record.to_json_line().context("Failed to serialize log record")?);
            buffer.push('\n');
        }

        let mut file = self.file.lock();
        file.write_all(buffer.as_bytes())
            .with_context(|| format!("Failed to append to translation log: {:?}", self.path))?;
        file.flush()
            .with_context(|| format!("Failed to flush translation log: {:?}", self.path))?;
        Ok(())
    }

    /// Read every well-formed record of a log file; a missing file has none
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<LogRecord>> {
        let path = path.as_ref();
        if !FileManager::file_exists(path) {
            return Ok(Vec::new());
        }

        let content = FileManager::read_to_string(path)?;
        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed log line {} in {:?}: {}", line_no + 1, path, e),
            }
        }
        Ok(records)
    }

    /// Latest outcome per index, in file order
    pub fn latest_outcomes(records: &[LogRecord]) -> BTreeMap<usize, Outcome> {
        let mut latest = BTreeMap::new();
        for record in records {
            latest.insert(record.index, record.outcome);
        }
        latest
    }

    /// Indices whose latest record is a failure
    pub fn failed_indices<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
        let records = Self::read_all(path)?;
        Ok(Self::latest_outcomes(&records)
            .into_iter()
            .filter(|(_, outcome)| *outcome == Outcome::Failed)
            .map(|(index, _)| index)
            .collect())
    }
}
