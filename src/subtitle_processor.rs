use std::collections::BTreeMap;
use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use std::path::{Path, PathBuf};
use log::{warn, debug};
use crate::file_utils::FileManager;

// @module: Subtitle parsing, rendering and source lookup

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: Sequence number, the stable index of the line
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        // Parse HH:MM:SS,mmm format
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        // Validate time components
        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Collection of subtitle entries ordered by sequence number
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries, sorted by `seq_num`
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Create a collection from entries, ordering them by sequence number
    pub fn new(source_file: PathBuf, mut entries: Vec<SubtitleEntry>) -> Self {
        entries.sort_by_key(|entry| entry.seq_num);
        SubtitleCollection { source_file, entries }
    }

    /// Load and parse an SRT file
    pub fn load_srt<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_text(path)?;
        let entries = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitle file: {:?}", path))?;
        debug!("Loaded {} subtitle entries from {:?}", entries.len(), path);
        Ok(Self::new(path.to_path_buf(), entries))
    }

    /// All sequence numbers in order
    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.seq_num).collect()
    }

    /// Render the collection as SRT text
    pub fn to_srt_string(&self) -> String {
        self.entries.iter().map(|e| e.to_string()).collect()
    }

    /// Write subtitles to an SRT file atomically
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        FileManager::write_atomic(path, &self.to_srt_string())
    }

    /// Parse SRT format string into subtitle entries.
    ///
    /// Sequence numbers are kept as written since they are the identity of a
    /// line across the source and every translated file. Entries with an empty
    /// text block are kept; rejecting them is the job of request validation.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>> {
        let mut by_seq: BTreeMap<usize, SubtitleEntry> = BTreeMap::new();

        // State variables for parsing
        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        let mut finish = |seq: usize, (start, end): (u64, u64), text: &str| {
            let entry = SubtitleEntry::new(seq, start, end, text.trim().to_string());
            if by_seq.insert(seq, entry).is_some() {
                warn!("Duplicate subtitle sequence number {}, keeping the last entry", seq);
            }
        };

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if let (Some(seq), Some(times)) = (current_seq_num, current_times) {
                    finish(seq, times, &current_text);
                    current_seq_num = None;
                    current_times = None;
                    current_text.clear();
                }
                continue;
            }

            if current_seq_num.is_none() {
                match trimmed.parse::<usize>() {
                    Ok(num) => current_seq_num = Some(num),
                    Err(_) => warn!("Unexpected text at line {} before sequence number: {}", line_no + 1, trimmed),
                }
                continue;
            }

            if current_times.is_none() {
                match TIMESTAMP_REGEX.captures(trimmed) {
                    Some(caps) => {
                        current_times = Some((Self::captured_ms(&caps, 1), Self::captured_ms(&caps, 5)));
                    }
                    None => {
                        warn!("Invalid timestamp at line {}: {}", line_no + 1, trimmed);
                        current_seq_num = None;
                    }
                }
                continue;
            }

            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        }

        if let (Some(seq), Some(times)) = (current_seq_num, current_times) {
            finish(seq, times, &current_text);
        }

        if by_seq.is_empty() {
            return Err(anyhow!("No valid subtitle entries were found in the SRT content"));
        }

        Ok(by_seq.into_values().collect())
    }

    fn captured_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
        let part = |i: usize| -> u64 {
            caps.get(start_idx + i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };
        (part(0) * 3600 + part(1) * 60 + part(2)) * 1000 + part(3)
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}

/// Read-only lookup of source text and surrounding context by index
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    entries: Vec<SubtitleEntry>,
    positions: BTreeMap<usize, usize>,
    context_size: usize,
}

impl SourceCatalog {
    /// Build a catalog; `context_size` neighbouring lines on each side are
    /// offered to the backend as context
    pub fn new(collection: &SubtitleCollection, context_size: usize) -> Self {
        let entries = collection.entries.clone();
        let positions = entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.seq_num, pos))
            .collect();
        Self { entries, positions, context_size }
    }

    /// All indices of the source, in order
    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.seq_num).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The source entry at `index`
    pub fn entry(&self, index: usize) -> Option<&SubtitleEntry> {
        self.positions.get(&index).map(|&pos| &self.entries[pos])
    }

    /// Source text at `index`
    pub fn text(&self, index: usize) -> Option<&str> {
        self.entry(index).map(|e| e.text.as_str())
    }

    /// Preceding and following lines around `index`, one per line, without
    /// the line itself
    pub fn context(&self, index: usize) -> String {
        let Some(&pos) = self.positions.get(&index) else {
            return String::new();
        };
        let start = pos.saturating_sub(self.context_size);
        let end = (pos + self.context_size + 1).min(self.entries.len());

        self.entries[start..end]
            .iter()
            .enumerate()
            .filter(|(offset, e)| start + offset != pos && !e.text.trim().is_empty())
            .map(|(_, e)| e.text.replace('\n', " "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
