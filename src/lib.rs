//! Songplay ETL - builds a star schema from raw song and activity data
//!
//! Provides:
//! - Source reading of JSON song records and log events
//! - Partitioned execution on a worker pool
//! - Dimension and fact table derivation (songs, artists, users, time, songplays)
//! - Partitioned Parquet table writing
//! - Pipeline orchestration with a run manifest

pub mod execution;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod staging;
pub mod transform;

// Re-export commonly used types
pub use execution::{Credentials, ExecutionSession, Partitioned, SessionConfig};
pub use export::{ExportError, TableWriteStats, TableWriter};
pub use models::{ArtistDim, LogEvent, SongDim, SongRecord, SongplayFact, TimeDim, UserDim};
pub use pipeline::{
    PipelineConfig, PipelineError, PipelineExecutor, PipelineReport, PipelineStage,
    run_pipeline,
};
pub use staging::{IngestError, IngestStats, SourceLocation, SourceReader};
pub use transform::{TransformError, WeekStart};
