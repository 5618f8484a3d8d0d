//! Pull-based observation streaming over discovered CSV files
//!
//! Files are parsed lazily, one at a time, only when the consumer requests
//! the next observation. Malformed rows and unreadable files are counted and
//! skipped; they never abort the replay.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::app::models::SemanticObservation;
use crate::app::services::ingest::parser;
use crate::constants::OBSERVATION_FILE_EXTENSION;
use crate::{Error, Result};

/// Statistics for observation ingestion
#[derive(Debug, Default, Clone)]
pub struct IngestStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub records_parsed: usize,
    pub records_malformed: usize,
}

impl IngestStats {
    /// Share of records that parsed cleanly
    pub fn parse_rate(&self) -> f64 {
        let total = self.records_parsed + self.records_malformed;
        if total == 0 {
            100.0
        } else {
            (self.records_parsed as f64 / total as f64) * 100.0
        }
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "Ingest Summary: {} files ({} failed) | {} observations parsed | \
             {} malformed records rejected ({:.1}% clean)",
            self.files_processed,
            self.files_failed,
            self.records_parsed,
            self.records_malformed,
            self.parse_rate()
        )
    }
}

/// Discover observation CSV files under a path.
///
/// A file path yields itself; a directory is walked recursively and `.csv`
/// entries are collected in stable name order.
pub fn discover_observation_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(Error::observation_format(format!(
            "input path '{}' is neither a file nor a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::directory_traversal(format!("failed to walk '{}'", root.display()), e)
        })?;
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(OBSERVATION_FILE_EXTENSION))
        {
            files.push(entry.path().to_path_buf());
        }
    }

    debug!("discovered {} observation files under '{}'", files.len(), root.display());
    Ok(files)
}

/// Lazily parses queued files and yields semantic observations one by one
pub struct ObservationStream {
    /// Queue of files to process
    file_queue: VecDeque<PathBuf>,
    /// Observations of the file currently being drained
    current: Option<std::vec::IntoIter<SemanticObservation>>,
    /// Statistics for monitoring
    stats: IngestStats,
}

impl ObservationStream {
    /// Create a stream over an explicit file list
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            file_queue: files.into(),
            current: None,
            stats: IngestStats::default(),
        }
    }

    /// Create a stream over every observation file under a path
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::new(discover_observation_files(path)?))
    }

    /// Get the next observation, loading files as needed
    pub fn next_observation(&mut self) -> Option<SemanticObservation> {
        loop {
            if let Some(iter) = &mut self.current {
                if let Some(observation) = iter.next() {
                    return Some(observation);
                }
                self.current = None;
            }

            let path = self.file_queue.pop_front()?;
            match self.read_file(&path) {
                Ok(observations) => {
                    self.stats.files_processed += 1;
                    debug!(
                        "parsed {}: {} observations",
                        path.display(),
                        observations.len()
                    );
                    self.current = Some(observations.into_iter());
                }
                Err(e) => {
                    self.stats.files_failed += 1;
                    error!("failed to read {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Parse one file; per-record problems are counted, not fatal
    fn read_file(&mut self, path: &Path) -> Result<Vec<SemanticObservation>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                Error::csv_parsing(path.display().to_string(), "cannot open file", Some(e))
            })?;

        let mut observations = Vec::new();
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    self.stats.records_malformed += 1;
                    warn!("unreadable record in {}: {}", path.display(), e);
                    continue;
                }
            };

            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            match parser::parse_record(&record) {
                Ok(observation) => {
                    self.stats.records_parsed += 1;
                    observations.push(observation);
                }
                Err(e) => {
                    self.stats.records_malformed += 1;
                    warn!("rejected record in {}: {}", path.display(), e);
                }
            }
        }

        Ok(observations)
    }

    /// Get current ingestion statistics
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Get remaining file count
    pub fn remaining_files(&self) -> usize {
        self.file_queue.len()
    }

    /// Check if the stream has more data
    pub fn has_more(&self) -> bool {
        !self.file_queue.is_empty() || self.current.is_some()
    }
}

impl Iterator for ObservationStream {
    type Item = SemanticObservation;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_observation()
    }
}

/// Stream trait impl for async iteration; file parsing is synchronous so
/// every poll is immediately ready
impl Stream for ObservationStream {
    type Item = SemanticObservation;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().next_observation())
    }
}
