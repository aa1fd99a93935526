//! Pipeline executor for running the full ETL

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use super::config::{PipelineConfig, PipelineStage};
use super::error::{PipelineError, PipelineResult};
use super::manifest::{PipelineStatus, RunManifest};
use super::progress::{StageProgress, format_bytes, format_number};
use crate::execution::ExecutionSession;
use crate::export::{TableWriteStats, TableWriter};
use crate::staging::{IngestStats, SourceLocation, SourceReader};
use crate::transform::{
    build_catalog, build_songplays, build_times, build_users, filter_song_plays,
};

/// Source name used for catalog song records in reports
pub const SONG_SOURCE: &str = "song_data";

/// Source name used for activity log events in reports
pub const LOG_SOURCE: &str = "log_data";

/// What one stage produced
#[derive(Debug, Default)]
struct StageOutcome {
    tables: Vec<TableWriteStats>,
    sources: Vec<(String, IngestStats)>,
}

/// Pipeline executor that runs all stages
pub struct PipelineExecutor {
    config: PipelineConfig,
    session: ExecutionSession,
    manifest: RunManifest,
}

impl PipelineExecutor {
    /// Create a new pipeline executor
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::ConfigError)?;

        let session = ExecutionSession::new(config.session_config())?;
        let run_id = Uuid::new_v4().to_string();
        let manifest = RunManifest::new(run_id, config.config_hash()).with_name(config.name.clone());

        Ok(Self {
            config,
            session,
            manifest,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn session(&self) -> &ExecutionSession {
        &self.session
    }

    /// Get the current run manifest
    pub fn manifest(&self) -> &RunManifest {
        &self.manifest
    }

    pub fn run_id(&self) -> &str {
        &self.manifest.run_id
    }

    /// Run the pipeline
    pub fn run(&mut self) -> PipelineResult<PipelineReport> {
        let _span = info_span!(
            "pipeline_run",
            run_id = %self.manifest.run_id,
            dry_run = self.config.dry_run
        )
        .entered();

        let stages = self.config.effective_stages();

        info!(
            run_id = %self.manifest.run_id,
            input = %self.config.input,
            output = %self.config.output,
            stages = ?stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            partitions = self.session.shuffle_partitions(),
            workers = self.session.workers(),
            "Starting pipeline"
        );

        if self.config.dry_run {
            return self.dry_run(&stages);
        }

        let reader = SourceReader::new(self.config.input_location());
        let writer = TableWriter::new(self.config.output_path(), self.manifest.run_id.clone());

        for stage in &stages {
            let _stage_span = info_span!("pipeline_stage", stage = stage.name()).entered();
            info!(stage = stage.name(), "Starting stage");

            let stage_start = Instant::now();
            let progress = StageProgress::start(*stage, self.config.verbose);

            match self.run_stage(*stage, &reader, &writer, &progress) {
                Ok(outcome) => {
                    let duration_ms = stage_start.elapsed().as_millis() as u64;
                    let rows: usize = outcome.tables.iter().map(|t| t.rows).sum();
                    info!(
                        stage = stage.name(),
                        tables = outcome.tables.len(),
                        rows,
                        duration_ms,
                        "Stage completed"
                    );
                    progress.finish_success(&format!(
                        "{}: {} rows in {}ms",
                        stage.name(),
                        format_number(rows as u64),
                        duration_ms
                    ));

                    for (source, stats) in outcome.sources {
                        self.manifest.record_source(source, stats);
                    }
                    for table in outcome.tables {
                        self.manifest.record_table(table);
                    }
                    self.manifest.complete_stage(*stage);
                }
                Err(e) => {
                    let error_msg = e.to_string();
                    error!(stage = stage.name(), error = %error_msg, "Stage failed");
                    progress.finish_error(&format!("{} failed", stage.name()));
                    self.manifest.fail(&error_msg);
                    return Err(e);
                }
            }
        }

        self.manifest.complete();
        let manifest_path = RunManifest::default_path(writer.root());
        std::fs::create_dir_all(writer.root())
            .map_err(|e| PipelineError::io_with_path(writer.root(), "creating tables directory", e))?;
        self.manifest.save(&manifest_path)?;

        let duration_ms = self.manifest.duration().num_milliseconds().max(0) as u64;
        info!(
            run_id = %self.manifest.run_id,
            duration_ms,
            stages_completed = self.manifest.completed_stages.len(),
            records_skipped = self.manifest.records_skipped(),
            "Pipeline completed"
        );

        Ok(PipelineReport {
            run_id: self.manifest.run_id.clone(),
            status: self.manifest.status,
            stages_completed: self.manifest.completed_stages.clone(),
            duration_ms,
            tables: self.manifest.tables.values().cloned().collect(),
            sources: self.manifest.sources.clone(),
            files_found: BTreeMap::new(),
            manifest_path: Some(manifest_path),
        })
    }

    /// Run a single stage
    fn run_stage(
        &self,
        stage: PipelineStage,
        reader: &SourceReader,
        writer: &TableWriter,
        progress: &StageProgress,
    ) -> PipelineResult<StageOutcome> {
        match stage {
            PipelineStage::Songs => self.run_songs(reader, writer, progress),
            PipelineStage::Logs => self.run_logs(reader, writer, progress),
        }
    }

    /// Build the songs and artists tables from the song catalog
    fn run_songs(
        &self,
        reader: &SourceReader,
        writer: &TableWriter,
        progress: &StageProgress,
    ) -> PipelineResult<StageOutcome> {
        progress.set_message("Reading song data");
        let songs = reader.read_songs(&self.session, &self.config.song_pattern)?;

        progress.set_message("Building songs and artists");
        let catalog = build_catalog(&self.session, &songs.records);
        debug!(
            songs = catalog.songs.len(),
            artists = catalog.artists.len(),
            "Catalog dimensions built"
        );

        progress.set_message("Writing songs and artists");
        let tables = vec![
            writer.write_table(&catalog.songs)?,
            writer.write_table(&catalog.artists)?,
        ];

        Ok(StageOutcome {
            tables,
            sources: vec![(SONG_SOURCE.to_string(), songs.stats)],
        })
    }

    /// Build the users, time and songplays tables from the activity logs
    ///
    /// The song catalog is read again here so that this stage can run on
    /// its own.
    fn run_logs(
        &self,
        reader: &SourceReader,
        writer: &TableWriter,
        progress: &StageProgress,
    ) -> PipelineResult<StageOutcome> {
        progress.set_message("Reading log data");
        let logs = reader.read_logs(&self.session, &self.config.log_pattern)?;

        let plays = filter_song_plays(&self.session, &logs.records);
        debug!(
            events = logs.records.len(),
            plays = plays.len(),
            "Filtered song-play events"
        );

        progress.set_message("Building users and time");
        let users = build_users(&self.session, &plays);
        let times = build_times(&self.session, &plays, self.config.week_start);

        progress.set_message("Joining songplays");
        let songs = reader.read_songs(&self.session, &self.config.song_pattern)?;
        let songplays = build_songplays(&self.session, &plays, &songs.records)?;

        progress.set_message("Writing users, time and songplays");
        let tables = vec![
            writer.write_table(&users)?,
            writer.write_table(&times)?,
            writer.write_table(&songplays)?,
        ];

        Ok(StageOutcome {
            tables,
            sources: vec![
                (LOG_SOURCE.to_string(), logs.stats),
                (SONG_SOURCE.to_string(), songs.stats),
            ],
        })
    }

    /// Run in dry-run mode (validation only)
    fn dry_run(&self, stages: &[PipelineStage]) -> PipelineResult<PipelineReport> {
        let location = self.config.input_location();
        if let SourceLocation::Local(path) = &location {
            if !path.is_dir() {
                return Err(PipelineError::SourceUnavailable {
                    location: location.display(),
                    reason: "input location does not exist or is not a directory".to_string(),
                });
            }
        }

        let reader = SourceReader::new(location);
        let mut files_found = BTreeMap::new();
        for stage in stages {
            let sources = match stage {
                PipelineStage::Songs => vec![(SONG_SOURCE, self.config.song_pattern.as_str())],
                PipelineStage::Logs => vec![
                    (LOG_SOURCE, self.config.log_pattern.as_str()),
                    (SONG_SOURCE, self.config.song_pattern.as_str()),
                ],
            };
            for (source, pattern) in sources {
                let files = reader.discover(pattern)?;
                if files.is_empty() {
                    warn!(source, pattern, "No files match source pattern");
                }
                debug!(source, files = files.len(), "Dry run discovery");
                files_found.insert(source.to_string(), files.len());
            }
        }

        info!(
            run_id = %self.manifest.run_id,
            files = ?files_found,
            "Dry run validation passed"
        );

        Ok(PipelineReport {
            run_id: self.manifest.run_id.clone(),
            status: PipelineStatus::Validated,
            stages_completed: Vec::new(),
            duration_ms: 0,
            tables: Vec::new(),
            sources: BTreeMap::new(),
            files_found,
            manifest_path: None,
        })
    }
}

/// Report from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Run ID
    pub run_id: String,
    /// Final status
    pub status: PipelineStatus,
    /// Completed stages
    pub stages_completed: Vec<PipelineStage>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Tables written, ordered by name
    pub tables: Vec<TableWriteStats>,
    /// Read statistics keyed by source
    pub sources: BTreeMap<String, IngestStats>,
    /// Files matched per source (dry run only)
    pub files_found: BTreeMap<String, usize>,
    /// Where the run manifest was written
    pub manifest_path: Option<PathBuf>,
}

impl PipelineReport {
    /// Check if pipeline was successful
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            PipelineStatus::Completed | PipelineStatus::Validated
        )
    }

    /// Stats for one table
    pub fn table(&self, name: &str) -> Option<&TableWriteStats> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Total records skipped across sources
    pub fn records_skipped(&self) -> usize {
        self.sources.values().map(|s| s.records_skipped).sum()
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else {
            format!("{}s", secs)
        }
    }

    /// Print summary to stderr
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("Pipeline {} - {}", self.run_id, self.status);
        eprintln!("Duration: {}", self.duration_formatted());

        if self.status == PipelineStatus::Validated {
            for (source, files) in &self.files_found {
                eprintln!("  - {}: {} files", source, format_number(*files as u64));
            }
            return;
        }

        eprintln!(
            "Stages completed: {}",
            self.stages_completed
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        for (source, stats) in &self.sources {
            eprintln!(
                "  {}: {} files, {}, {} records, {} skipped",
                source,
                stats.files_processed,
                format_bytes(stats.bytes_processed),
                format_number(stats.records_read as u64),
                format_number(stats.records_skipped as u64)
            );
        }

        for table in &self.tables {
            eprintln!(
                "  - {}: {} rows, {} files ({}ms)",
                table.table,
                format_number(table.rows as u64),
                table.files,
                table.duration_ms
            );
        }

        if let Some(path) = &self.manifest_path {
            eprintln!("Manifest: {}", path.display());
        }
    }
}
