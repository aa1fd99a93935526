//! Run manifest written next to the output tables

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::PipelineStage;
use super::error::{PipelineError, PipelineResult};
use crate::export::TableWriteStats;
use crate::staging::IngestStats;

/// File name of the manifest inside the `tables/` directory
pub const MANIFEST_FILE: &str = "_manifest.json";

/// Record of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    /// Unique pipeline run ID
    pub run_id: String,
    /// Pipeline name
    pub name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: PipelineStatus,
    /// Completed stages
    pub completed_stages: Vec<PipelineStage>,
    /// Write statistics keyed by table name
    pub tables: BTreeMap<String, TableWriteStats>,
    /// Read statistics keyed by source (`song_data`, `log_data`)
    pub sources: BTreeMap<String, IngestStats>,
    /// Error message if failed
    pub error: Option<String>,
    /// Configuration hash, credentials excluded
    pub config_hash: String,
}

impl RunManifest {
    pub fn new(run_id: impl Into<String>, config_hash: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            name: None,
            started_at: Utc::now(),
            finished_at: None,
            status: PipelineStatus::Running,
            completed_stages: Vec::new(),
            tables: BTreeMap::new(),
            sources: BTreeMap::new(),
            error: None,
            config_hash: config_hash.into(),
        }
    }

    /// Set pipeline name
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn record_source(&mut self, source: impl Into<String>, stats: IngestStats) {
        self.sources.insert(source.into(), stats);
    }

    pub fn record_table(&mut self, stats: TableWriteStats) {
        self.tables.insert(stats.table.clone(), stats);
    }

    /// Mark a stage as completed
    pub fn complete_stage(&mut self, stage: PipelineStage) {
        if !self.completed_stages.contains(&stage) {
            self.completed_stages.push(stage);
        }
    }

    /// Mark pipeline as completed
    pub fn complete(&mut self) {
        self.status = PipelineStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Mark pipeline as failed
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = PipelineStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    /// Calculate duration so far
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Total records skipped across sources
    pub fn records_skipped(&self) -> usize {
        self.sources.values().map(|s| s.records_skipped).sum()
    }

    /// Save manifest to file
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| PipelineError::io_with_path(path, "writing run manifest", e))?;
        Ok(())
    }

    /// Load manifest from file
    pub fn load(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&json)?;
        Ok(manifest)
    }

    /// Manifest location for a tables directory
    pub fn default_path(tables_dir: &Path) -> PathBuf {
        tables_dir.join(MANIFEST_FILE)
    }
}

/// Pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Pipeline is running
    Running,
    /// Pipeline completed successfully
    Completed,
    /// Inputs validated, nothing executed
    Validated,
    /// Pipeline failed
    Failed,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Validated => write!(f, "validated"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_new() {
        let manifest = RunManifest::new("run-123", "config-hash");
        assert_eq!(manifest.run_id, "run-123");
        assert_eq!(manifest.status, PipelineStatus::Running);
        assert!(manifest.finished_at.is_none());
        assert!(manifest.completed_stages.is_empty());
    }

    #[test]
    fn test_manifest_lifecycle() {
        let mut manifest = RunManifest::new("run-123", "hash");
        let mut stats = IngestStats::new("log_data/*/*/*.json");
        stats.records_skipped = 3;
        manifest.record_source("log_data", stats);
        manifest.complete_stage(PipelineStage::Logs);
        manifest.complete_stage(PipelineStage::Logs);
        manifest.complete();

        assert_eq!(manifest.status, PipelineStatus::Completed);
        assert_eq!(manifest.completed_stages, vec![PipelineStage::Logs]);
        assert_eq!(manifest.records_skipped(), 3);
        assert!(manifest.duration() >= chrono::Duration::zero());
    }

    #[test]
    fn test_manifest_fail() {
        let mut manifest = RunManifest::new("run-123", "hash");
        manifest.fail("disk full");
        assert_eq!(manifest.status, PipelineStatus::Failed);
        assert_eq!(manifest.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_manifest_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = RunManifest::default_path(temp.path());
        assert!(path.ends_with("_manifest.json"));

        let mut manifest = RunManifest::new("run-123", "hash").with_name(Some("nightly".into()));
        manifest.record_table(TableWriteStats {
            table: "users".to_string(),
            rows: 7,
            files: 1,
            ..Default::default()
        });
        manifest.complete();
        manifest.save(&path).unwrap();

        let loaded = RunManifest::load(&path).unwrap();
        assert_eq!(loaded.run_id, "run-123");
        assert_eq!(loaded.name.as_deref(), Some("nightly"));
        assert_eq!(loaded.tables["users"].rows, 7);
        assert_eq!(loaded.status, PipelineStatus::Completed);
    }
}
