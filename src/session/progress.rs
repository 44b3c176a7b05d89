/*!
 * Durable set of completed indices.
 *
 * Persisted as one decimal index per line. An index that is not listed is
 * pending, including lines that were in flight when a previous run stopped.
 */

use std::collections::BTreeSet;
use std::path::Path;
use anyhow::Result;
use log::warn;

use crate::file_utils::FileManager;

/// Set of indices translated into every target language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressIndex {
    completed: BTreeSet<usize>,
}

impl ProgressIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a progress file; a missing file is an empty index
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !FileManager::file_exists(path) {
            return Ok(Self::new());
        }

        let content = FileManager::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse the line format, skipping lines that are not an index
    pub fn parse(content: &str) -> Self {
        let mut completed = BTreeSet::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<usize>() {
                Ok(index) => {
                    completed.insert(index);
                }
                Err(_) => warn!("Skipping invalid progress line {}: {:?}", line_no + 1, line),
            }
        }
        Self { completed }
    }

    pub fn mark_done(&mut self, index: usize) {
        self.completed.insert(index);
    }

    pub fn is_done(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Completed indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.completed.iter().copied()
    }

    /// Indices of `all` that are not completed, in the given order
    pub fn pending<'a, I>(&self, all: I) -> Vec<usize>
    where
        I: IntoIterator<Item = &'a usize>,
    {
        all.into_iter()
            .copied()
            .filter(|index| !self.completed.contains(index))
            .collect()
    }

    /// Render the line format
    pub fn render(&self) -> String {
        self.completed.iter().map(|index| format!("{}\n", index)).collect()
    }

    /// Atomically rewrite the progress file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        FileManager::write_atomic(path, &self.render())
    }
}
