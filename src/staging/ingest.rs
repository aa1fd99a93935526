//! Source discovery and JSON record parsing

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::SourceLocation;
use super::error::{IngestError, SkippedRecord};
use crate::execution::{ExecutionSession, Partitioned};
use crate::models::{LogEvent, SongRecord};

/// Maximum number of skip messages kept in [`IngestStats`]
const MAX_REPORTED_SKIPS: usize = 100;

/// Statistics from reading one source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Pattern the files were matched with
    pub pattern: String,
    /// Number of files read
    pub files_processed: usize,
    /// Total bytes read
    pub bytes_processed: u64,
    /// Number of records parsed
    pub records_read: usize,
    /// Number of records skipped because they failed to parse
    pub records_skipped: usize,
    /// Skip messages (limited to the first 100)
    pub skipped: Vec<String>,
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    /// Record a skipped record (messages limited to 100)
    pub fn add_skipped(&mut self, skipped: &SkippedRecord) {
        self.records_skipped += 1;
        if self.skipped.len() < MAX_REPORTED_SKIPS {
            self.skipped.push(skipped.to_string());
        }
    }

    /// Get records per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_read as f64 / secs
        }
    }
}

/// A discovered file to read
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Records parsed from one file
#[derive(Debug)]
pub struct FileRecords<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRecord>,
    pub bytes: u64,
}

/// Records read from a source, one partition per file
#[derive(Debug)]
pub struct SourceData<T> {
    pub records: Partitioned<T>,
    pub stats: IngestStats,
}

/// Discover files matching a pattern under a local base directory
///
/// Matches are sorted by path for consistent ordering. A base that is
/// missing, is not a directory, or cannot be listed is `SourceUnavailable`.
pub fn discover_local_files(
    base_path: &Path,
    pattern: &str,
) -> Result<Vec<DiscoveredFile>, IngestError> {
    let location = base_path.display().to_string();
    let metadata = fs::metadata(base_path)
        .map_err(|e| IngestError::unavailable(&location, e.to_string()))?;
    if !metadata.is_dir() {
        return Err(IngestError::unavailable(&location, "not a directory"));
    }

    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&location).trim_end_matches('/'),
        pattern.trim_start_matches('/')
    );

    let entries = glob::glob(&full_pattern)
        .map_err(|e| IngestError::InvalidPattern(format!("{}: {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IngestError::unavailable(&location, e.to_string()))?;
        if path.is_file() {
            let metadata = fs::metadata(&path).map_err(|source| IngestError::Io {
                path: path.clone(),
                source,
            })?;
            files.push(DiscoveredFile {
                path,
                size: metadata.len(),
            });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(base = %location, pattern, files = files.len(), "File discovery complete");
    Ok(files)
}

/// Parse a JSON source file into typed records
///
/// The file holds a stream of JSON documents: one per line, a single
/// (possibly pretty-printed) document, or several concatenated. A document
/// that is an array contributes each element. Documents that fail to parse
/// are returned in `skipped` with the line they start on, never as an error;
/// after malformed JSON, parsing resumes at the next line.
pub fn parse_records<T: DeserializeOwned>(path: &Path) -> Result<FileRecords<T>, IngestError> {
    let content = fs::read(path).map_err(|e| {
        IngestError::unavailable(path.display().to_string(), e.to_string())
    })?;

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut skip = |line: usize, error: String| {
        skipped.push(SkippedRecord {
            path: path.to_path_buf(),
            line,
            error,
        })
    };

    let mut lines = LineCounter::new();
    let mut pos = 0;
    while pos < content.len() {
        let start = pos
            + content[pos..]
                .iter()
                .take_while(|b| b.is_ascii_whitespace())
                .count();
        if start == content.len() {
            break;
        }
        let line = lines.line_at(&content, start);

        let mut stream =
            serde_json::Deserializer::from_slice(&content[start..]).into_iter::<serde_json::Value>();
        let value = match stream.next() {
            Some(Ok(value)) => {
                pos = start + stream.byte_offset();
                value
            }
            Some(Err(e)) => {
                skip(line, e.to_string());
                pos = content[start..]
                    .iter()
                    .position(|b| *b == b'\n')
                    .map_or(content.len(), |newline| start + newline + 1);
                continue;
            }
            None => break,
        };

        let documents = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };

        for document in documents {
            match serde_json::from_value::<T>(document) {
                Ok(record) => records.push(record),
                Err(e) => skip(line, e.to_string()),
            }
        }
    }

    Ok(FileRecords {
        records,
        skipped,
        bytes: content.len() as u64,
    })
}

/// 1-based line numbers for increasing byte offsets
struct LineCounter {
    line: usize,
    offset: usize,
}

impl LineCounter {
    fn new() -> Self {
        Self { line: 1, offset: 0 }
    }

    fn line_at(&mut self, content: &[u8], offset: usize) -> usize {
        self.line += content[self.offset..offset]
            .iter()
            .filter(|b| **b == b'\n')
            .count();
        self.offset = offset;
        self.line
    }
}

/// Reader for the raw song and log sources under one base location
#[derive(Debug, Clone)]
pub struct SourceReader {
    location: SourceLocation,
}

impl SourceReader {
    pub fn new(location: SourceLocation) -> Self {
        Self { location }
    }

    /// Discover files matching `pattern` under the base location
    pub fn discover(&self, pattern: &str) -> Result<Vec<DiscoveredFile>, IngestError> {
        match &self.location {
            SourceLocation::Local(path) => discover_local_files(path, pattern),
            SourceLocation::Remote(url) => Err(IngestError::unavailable(
                url,
                "no object-store connector is available for remote locations",
            )),
        }
    }

    /// Read every file matching `pattern`, one partition per file
    pub fn read<T>(
        &self,
        session: &ExecutionSession,
        pattern: &str,
    ) -> Result<SourceData<T>, IngestError>
    where
        T: DeserializeOwned + Send,
    {
        let start = Instant::now();
        let mut stats = IngestStats::new(pattern);

        let files = self.discover(pattern)?;
        if files.is_empty() {
            warn!(
                location = %self.location.display(),
                pattern,
                "No source files matched pattern"
            );
        }

        let parsed = session.install(|| {
            files
                .par_iter()
                .map(|file| parse_records::<T>(&file.path))
                .collect::<Result<Vec<_>, _>>()
        })?;

        let mut partitions = Vec::with_capacity(parsed.len());
        for file in parsed {
            stats.files_processed += 1;
            stats.bytes_processed += file.bytes;
            stats.records_read += file.records.len();
            for skipped in &file.skipped {
                warn!(record = %skipped, "Skipping malformed record");
                stats.add_skipped(skipped);
            }
            partitions.push(file.records);
        }

        stats.duration = start.elapsed();
        info!(
            pattern,
            files = stats.files_processed,
            records = stats.records_read,
            skipped = stats.records_skipped,
            records_per_sec = stats.throughput() as u64,
            "Source read complete"
        );

        Ok(SourceData {
            records: Partitioned::new(partitions),
            stats,
        })
    }

    /// Read catalog song records
    pub fn read_songs(
        &self,
        session: &ExecutionSession,
        pattern: &str,
    ) -> Result<SourceData<SongRecord>, IngestError> {
        self.read(session, pattern)
    }

    /// Read activity log events
    pub fn read_logs(
        &self,
        session: &ExecutionSession,
        pattern: &str,
    ) -> Result<SourceData<LogEvent>, IngestError> {
        self.read(session, pattern)
    }
}
