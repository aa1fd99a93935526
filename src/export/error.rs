//! Error types for table writing

use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Errors that can occur while persisting a table
#[derive(Error, Debug)]
pub enum ExportError {
    /// Filesystem operation on the output location failed
    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Column is unknown or cannot be encoded in a directory name
    #[error("Table '{table}' cannot be partitioned by column '{column}'")]
    UnsupportedPartitionColumn { table: String, column: String },

    /// Record batch construction error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Columnar file encoding error
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
}

impl ExportError {
    pub fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ExportError::WriteFailure { path, source } => {
                format!(
                    "Cannot write output: {}\nReason: {source}\n\n\
                    Hint: Check that the output location is writable and has free space.",
                    path.display()
                )
            }
            ExportError::UnsupportedPartitionColumn { table, column } => {
                format!(
                    "Table '{table}' has no partitionable column '{column}'\n\n\
                    Hint: Partition by a string or integer column of the table."
                )
            }
            _ => self.to_string(),
        }
    }
}
