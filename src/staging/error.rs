//! Error types for source reading

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading raw sources
#[derive(Error, Debug)]
pub enum IngestError {
    /// Source location cannot be listed or read
    #[error("Source not accessible: {location} - {reason}")]
    SourceUnavailable { location: String, reason: String },

    /// Pattern matching error
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// IO error with path context
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub fn unavailable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            IngestError::SourceUnavailable { location, reason } => {
                format!(
                    "Cannot access source: {location}\nReason: {reason}\n\n\
                    Hint: Check that the input location exists and is readable."
                )
            }
            IngestError::InvalidPattern(pattern) => {
                format!(
                    "Invalid glob pattern: {pattern}\n\n\
                    Hint: Use standard glob syntax like 'song_data/*/*/*/*.json'."
                )
            }
            _ => self.to_string(),
        }
    }
}

/// A record that failed to parse and was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    pub error: String,
}

impl std::fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.error)
    }
}
