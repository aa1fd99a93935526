//! Pipeline orchestration
//!
//! Runs the ETL end to end:
//! - Read song and log sources from the input location
//! - Build the songs, artists, users, time and songplays tables
//! - Write each table as partitioned Parquet under `<output>/tables/`
//! - Record the run in `tables/_manifest.json`
//!
//! # Example
//!
//! ```rust,ignore
//! use songplay_etl::pipeline::{PipelineConfig, PipelineExecutor, PipelineStage};
//!
//! let config = PipelineConfig::new()
//!     .with_input("/data/input")
//!     .with_output("/data/output")
//!     .with_partitions(8)
//!     .with_stages(vec![PipelineStage::Songs, PipelineStage::Logs]);
//!
//! let mut executor = PipelineExecutor::new(config)?;
//! let report = executor.run()?;
//!
//! println!("Pipeline completed in {}", report.duration_formatted());
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Songs**: song catalog into the `songs` and `artists` tables
//! 2. **Logs**: activity logs into the `users`, `times` and `songplays`
//!    tables; reads the song catalog again for the songplays join
//!
//! # Dry Run
//!
//! Validates the input location and counts matching source files without
//! reading or writing any data.

mod config;
mod error;
mod executor;
mod manifest;
mod progress;

pub use config::{DEFAULT_PARTITIONS, PipelineConfig, PipelineStage};
pub use error::{PipelineError, PipelineResult};
pub use executor::{LOG_SOURCE, PipelineExecutor, PipelineReport, SONG_SOURCE};
pub use manifest::{MANIFEST_FILE, PipelineStatus, RunManifest};
pub use progress::{StageProgress, format_bytes, format_number};

/// Run a pipeline with the given configuration
///
/// This is a convenience function for simple pipeline execution.
pub fn run_pipeline(config: PipelineConfig) -> PipelineResult<PipelineReport> {
    let mut executor = PipelineExecutor::new(config)?;
    executor.run()
}
