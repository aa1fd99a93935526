//! Source reading
//!
//! Locates raw JSON files under an input location and parses them into typed
//! [`SongRecord`](crate::models::SongRecord) and
//! [`LogEvent`](crate::models::LogEvent) sets. No business logic happens
//! here: records are only structurally parsed, and records that fail to parse
//! are skipped and counted.

mod config;
mod error;
mod ingest;

pub use config::{LOG_DATA_PATTERN, SONG_DATA_PATTERN, SourceLocation};
pub use error::{IngestError, SkippedRecord};
pub use ingest::{
    DiscoveredFile, FileRecords, IngestStats, SourceData, SourceReader, discover_local_files,
    parse_records,
};
