/*!
 * In-memory store of translated subtitle lines, one ordered map per target
 * language, joined to the source timings by index.
 *
 * The store is only mutated by the persistence stage and is flushed to
 * `<lang>.srt` files at checkpoints.
 */

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use anyhow::Result;
use log::{debug, warn};

use crate::file_utils::FileManager;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

/// Per-language translated lines keyed by source index
#[derive(Debug, Clone, Default)]
pub struct SubtitleStore {
    languages: Vec<String>,
    timings: BTreeMap<usize, (u64, u64)>,
    lines: HashMap<String, BTreeMap<usize, String>>,
}

impl SubtitleStore {
    /// Create an empty store for `languages`, taking timings from the source
    pub fn new(source: &SubtitleCollection, languages: &[String]) -> Self {
        let timings = source
            .entries
            .iter()
            .map(|e| (e.seq_num, (e.start_time_ms, e.end_time_ms)))
            .collect();
        let lines = languages
            .iter()
            .map(|lang| (lang.clone(), BTreeMap::new()))
            .collect();

        Self {
            languages: languages.to_vec(),
            timings,
            lines,
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Write (or overwrite) the line at `index` for `language`
    pub fn write(&mut self, language: &str, index: usize, text: &str) {
        if !self.lines.contains_key(language) {
            self.languages.push(language.to_string());
        }
        self.lines
            .entry(language.to_string())
            .or_default()
            .insert(index, text.to_string());
    }

    /// Line at `index` for `language`
    pub fn get(&self, language: &str, index: usize) -> Option<&str> {
        self.lines
            .get(language)
            .and_then(|lines| lines.get(&index))
            .map(String::as_str)
    }

    /// Whether every language has a non-empty line at `index`
    pub fn is_complete(&self, index: usize) -> bool {
        self.languages.iter().all(|lang| {
            self.get(lang, index)
                .map(|text| !text.trim().is_empty())
                .unwrap_or(false)
        })
    }

    /// Number of lines held for `language`
    pub fn len(&self, language: &str) -> usize {
        self.lines.get(language).map(BTreeMap::len).unwrap_or(0)
    }

    /// Entries of `language` ordered by index, using the source timings
    pub fn entries(&self, language: &str) -> Vec<SubtitleEntry> {
        let Some(lines) = self.lines.get(language) else {
            return Vec::new();
        };

        lines
            .iter()
            .filter_map(|(&index, text)| match self.timings.get(&index) {
                Some(&(start, end)) => Some(SubtitleEntry::new(index, start, end, text.clone())),
                None => {
                    warn!("No source timing for index {} ({}), line skipped", index, language);
                    None
                }
            })
            .collect()
    }

    /// Render `language` as an SRT document ordered by index
    pub fn render(&self, language: &str) -> String {
        self.entries(language).iter().map(|e| e.to_string()).collect()
    }

    /// Load the lines of a previously written output file. Indices unknown to
    /// the source are ignored.
    pub fn load_language<P: AsRef<Path>>(&mut self, language: &str, path: P) -> Result<usize> {
        let path = path.as_ref();
        if !FileManager::file_exists(path) {
            return Ok(0);
        }

        let collection = SubtitleCollection::load_srt(path)?;
        let mut loaded = 0;
        for entry in collection.entries {
            if self.timings.contains_key(&entry.seq_num) {
                self.write(language, entry.seq_num, &entry.text);
                loaded += 1;
            }
        }
        debug!("Loaded {} existing {} lines from {:?}", loaded, language, path);
        Ok(loaded)
    }
}
