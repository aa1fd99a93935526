//! Error types for pipeline operations
//!
//! Layer errors (ingest, transform, export, session) convert into
//! [`PipelineError`], which keeps the cause chain for debugging and renders a
//! user-facing message with a hint for the CLI.

use std::path::PathBuf;
use thiserror::Error;

use crate::execution::SessionError;
use crate::export::ExportError;
use crate::staging::IngestError;
use crate::transform::TransformError;

/// Errors that can occur during pipeline execution
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input location cannot be listed or read
    #[error("Source not accessible: {location} - {reason}")]
    SourceUnavailable { location: String, reason: String },

    /// A table could not be persisted
    #[error("Write failed: {0}")]
    WriteFailure(#[source] ExportError),

    /// Surrogate keys ran out for a partition
    #[error("Key assignment failed: {0}")]
    KeySpaceExhausted(#[source] TransformError),

    /// Stage failed with underlying cause
    #[error("Stage '{stage}' failed: {source}")]
    StageFailure {
        stage: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error with path context
    #[error("IO error with {path}: {message}")]
    IoWithPath {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create a stage failure with underlying error
    pub fn stage_failure<E>(stage: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StageFailure {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Create an IO error with path context
    pub fn io_with_path(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::IoWithPath {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Check if rerunning unchanged could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::Io(_) | PipelineError::IoWithPath { .. }
        )
    }

    /// Check if the run cannot succeed without changing configuration or input
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get the stage name if this is a stage error
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            PipelineError::StageFailure { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ConfigError(msg) => {
                format!(
                    "Configuration error: {msg}\n\nHint: Check the command-line arguments and your pipeline configuration file."
                )
            }
            PipelineError::SourceUnavailable { location, reason } => {
                format!(
                    "Cannot access source: {location}\nReason: {reason}\n\n\
                    Hint: Check that the input location exists and contains song_data/ and log_data/."
                )
            }
            PipelineError::WriteFailure(err) => err.user_message(),
            PipelineError::KeySpaceExhausted(err) => {
                format!(
                    "{err}\n\nHint: Increase the partition count so that each partition holds fewer rows."
                )
            }
            PipelineError::StageFailure { stage, source } => {
                format!("Stage '{stage}' failed: {source}")
            }
            PipelineError::FileNotFound(path) => {
                format!(
                    "File not found: {}\n\nHint: Check that the file exists and the path is correct.",
                    path.display()
                )
            }
            PipelineError::Toml(err) => {
                format!("Invalid configuration file: {err}\n\nHint: Check the TOML syntax and field names.")
            }
            _ => self.to_string(),
        }
    }
}

impl From<IngestError> for PipelineError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::SourceUnavailable { location, reason } => {
                PipelineError::SourceUnavailable { location, reason }
            }
            IngestError::InvalidPattern(pattern) => {
                PipelineError::ConfigError(format!("Invalid source pattern: {pattern}"))
            }
            IngestError::Io { path, source } => PipelineError::SourceUnavailable {
                location: path.display().to_string(),
                reason: source.to_string(),
            },
        }
    }
}

impl From<ExportError> for PipelineError {
    fn from(err: ExportError) -> Self {
        PipelineError::WriteFailure(err)
    }
}

impl From<TransformError> for PipelineError {
    fn from(err: TransformError) -> Self {
        PipelineError::KeySpaceExhausted(err)
    }
}

impl From<SessionError> for PipelineError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidPartitions(_) => PipelineError::ConfigError(err.to_string()),
            SessionError::ThreadPool(_) => PipelineError::stage_failure("session", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = PipelineError::stage_failure("songs", io_err);
        assert!(err.to_string().contains("songs"));
        assert_eq!(err.stage_name(), Some("songs"));
    }

    #[test]
    fn test_io_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = PipelineError::io_with_path("/path/to/file", "reading config", io_err);
        let display = err.to_string();
        assert!(display.contains("/path/to/file"));
        assert!(display.contains("reading config"));
    }

    #[test]
    fn test_ingest_error_conversion() {
        let err: PipelineError = IngestError::unavailable("/data/in", "not found").into();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
        assert!(err.is_fatal());
        assert!(err.user_message().contains("Hint:"));

        let err: PipelineError = IngestError::InvalidPattern("[".to_string()).into();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let export = ExportError::write_failure(
            "/out/tables/songs.parquet",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let err: PipelineError = export.into();
        assert!(matches!(err, PipelineError::WriteFailure(_)));
        assert!(!err.is_recoverable());
        assert!(err.is_fatal());

        let unsupported: PipelineError = ExportError::UnsupportedPartitionColumn {
            table: "songs".to_string(),
            column: "duration".to_string(),
        }
        .into();
        assert!(unsupported.is_fatal());
    }

    #[test]
    fn test_key_space_exhausted_message() {
        let err: PipelineError = TransformError::LocalCounterOverflow { partition: 3 }.into();
        assert!(matches!(err, PipelineError::KeySpaceExhausted(_)));
        assert!(err.user_message().contains("partition count"));
    }

    #[test]
    fn test_session_error_conversion() {
        let err: PipelineError = SessionError::InvalidPartitions(0).into();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }
}
