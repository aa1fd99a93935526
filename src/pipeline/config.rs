//! Pipeline configuration types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::{PipelineError, PipelineResult};
use crate::execution::{Credentials, SessionConfig};
use crate::staging::{LOG_DATA_PATTERN, SONG_DATA_PATTERN, SourceLocation};
use crate::transform::{MAX_PARTITIONS, WeekStart};

/// Default number of shuffle partitions
pub const DEFAULT_PARTITIONS: usize = 4;

/// Main pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the pipeline run
    pub name: Option<String>,
    /// Base location of the raw `song_data` and `log_data` sources
    pub input: String,
    /// Base location the `tables/` directory is written under
    pub output: String,
    /// Glob for song records, relative to `input`
    pub song_pattern: String,
    /// Glob for log events, relative to `input`
    pub log_pattern: String,
    /// Shuffle partitions for dedup and the songplays join
    pub partitions: usize,
    /// Worker threads (0 = one per core)
    pub workers: usize,
    /// First day of the week for `weekday` numbering
    pub week_start: WeekStart,
    /// Stages to run (empty = all)
    pub stages: Vec<PipelineStage>,
    /// Enable dry-run mode
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
    /// Storage credentials handed to the execution session
    pub credentials: Option<Credentials>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: None,
            input: String::new(),
            output: String::new(),
            song_pattern: SONG_DATA_PATTERN.to_string(),
            log_pattern: LOG_DATA_PATTERN.to_string(),
            partitions: DEFAULT_PARTITIONS,
            workers: 0,
            week_start: WeekStart::default(),
            stages: Vec::new(),
            dry_run: false,
            verbose: false,
            credentials: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline config
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn load(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io_with_path(path, "reading config", e))?;
        let config: Self = toml::from_str(&text)?;
        Ok(config)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the input location
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    /// Set the output location
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_song_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.song_pattern = pattern.into();
        self
    }

    pub fn with_log_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.log_pattern = pattern.into();
        self
    }

    /// Set the shuffle partition count
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    /// Set the worker thread count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    /// Set specific stages to run
    pub fn with_stages(mut self, stages: Vec<PipelineStage>) -> Self {
        self.stages = stages;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Get stages to run (all if empty), in execution order
    pub fn effective_stages(&self) -> Vec<PipelineStage> {
        PipelineStage::all()
            .into_iter()
            .filter(|stage| self.should_run_stage(*stage))
            .collect()
    }

    /// Check if a specific stage should run
    pub fn should_run_stage(&self, stage: PipelineStage) -> bool {
        if self.stages.is_empty() {
            true
        } else {
            self.stages.contains(&stage)
        }
    }

    pub fn input_location(&self) -> SourceLocation {
        SourceLocation::parse(&self.input)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output)
    }

    /// Session parameters derived from this configuration
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            workers: self.workers,
            shuffle_partitions: self.partitions,
            credentials: self.credentials.clone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.input.trim().is_empty() {
            return Err("Input location is required".to_string());
        }
        if self.output.trim().is_empty() {
            return Err("Output location is required".to_string());
        }
        if matches!(SourceLocation::parse(&self.output), SourceLocation::Remote(_)) {
            return Err(format!(
                "Output location {} is remote; only local output is supported",
                self.output
            ));
        }
        if self.partitions == 0 || self.partitions > MAX_PARTITIONS {
            return Err(format!(
                "Partition count must be between 1 and {}, got {}",
                MAX_PARTITIONS, self.partitions
            ));
        }
        if self.song_pattern.trim().is_empty() || self.log_pattern.trim().is_empty() {
            return Err("Source patterns must not be empty".to_string());
        }
        if let Some(credentials) = &self.credentials {
            if !credentials.is_complete() {
                return Err(
                    "Credentials need both an access key id and a secret access key".to_string(),
                );
            }
        }
        Ok(())
    }

    /// SHA-256 of the effective configuration, credentials excluded
    pub fn config_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.input.as_bytes());
        hasher.update([0]);
        hasher.update(self.output.as_bytes());
        hasher.update([0]);
        hasher.update(self.song_pattern.as_bytes());
        hasher.update([0]);
        hasher.update(self.log_pattern.as_bytes());
        hasher.update([0]);
        hasher.update(self.partitions.to_le_bytes());
        hasher.update(self.week_start.name().as_bytes());
        for stage in self.effective_stages() {
            hasher.update(stage.name().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Stage 1: Song catalog into the songs and artists tables
    Songs,
    /// Stage 2: Activity logs into the users, time and songplays tables
    Logs,
}

impl PipelineStage {
    /// Get all stages in execution order
    pub fn all() -> Vec<Self> {
        vec![Self::Songs, Self::Logs]
    }

    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Songs => "songs",
            Self::Logs => "logs",
        }
    }

    /// Get stage description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Songs => "Build songs and artists tables from song data",
            Self::Logs => "Build users, time and songplays tables from log data",
        }
    }

    /// Get stage index (1-based)
    pub fn index(&self) -> usize {
        match self {
            Self::Songs => 1,
            Self::Logs => 2,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "songs" | "song_data" | "1" => Ok(Self::Songs),
            "logs" | "log_data" | "2" => Ok(Self::Logs),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}
