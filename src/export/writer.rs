//! Partitioned Parquet table writer
//!
//! Tables are written in a Hive-style layout:
//!
//! ```text
//! <output>/tables/songplays.parquet/
//!   year=2018/month=11/part-00000-<run_id>.snappy.parquet
//!   _SUCCESS
//! ```
//!
//! Partition columns are encoded in directory names and removed from the data
//! files. A write always replaces the whole table: files go into a hidden
//! staging directory next to the target, which is swapped into place once
//! every file and the `_SUCCESS` marker are written.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;

use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::ExportError;
use super::schema::TableRow;
use crate::execution::Partitioned;
use crate::models::{ArtistDim, SongDim, SongplayFact, TimeDim, UserDim};

/// Directory name used for null or empty partition values
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Marker file written after a table is complete
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Directory under the output root that holds every table
pub const TABLES_DIR: &str = "tables";

/// Where and how one table is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Directory name under `tables/`
    pub location: &'static str,
    pub partition_by: &'static [&'static str],
}

pub const SONGS_TABLE: TableSpec = TableSpec {
    location: "songs.parquet",
    partition_by: &["year", "artist_id"],
};

pub const ARTISTS_TABLE: TableSpec = TableSpec {
    location: "artists.parquet",
    partition_by: &[],
};

pub const USERS_TABLE: TableSpec = TableSpec {
    location: "users.parquet",
    partition_by: &[],
};

pub const TIMES_TABLE: TableSpec = TableSpec {
    location: "times.parquet",
    partition_by: &["year", "month"],
};

pub const SONGPLAYS_TABLE: TableSpec = TableSpec {
    location: "songplays.parquet",
    partition_by: &["year", "month"],
};

/// Write-side description of a table row type
pub trait WritableTable: TableRow {
    const SPEC: TableSpec;
}

impl WritableTable for SongDim {
    const SPEC: TableSpec = SONGS_TABLE;
}

impl WritableTable for ArtistDim {
    const SPEC: TableSpec = ARTISTS_TABLE;
}

impl WritableTable for UserDim {
    const SPEC: TableSpec = USERS_TABLE;
}

impl WritableTable for TimeDim {
    const SPEC: TableSpec = TIMES_TABLE;
}

impl WritableTable for SongplayFact {
    const SPEC: TableSpec = SONGPLAYS_TABLE;
}

/// Statistics from writing one table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableWriteStats {
    pub table: String,
    pub rows: usize,
    /// Data files written
    pub files: usize,
    /// Distinct partition directories (0 for unpartitioned tables)
    pub partitions: usize,
    pub path: PathBuf,
    pub duration_ms: u64,
}

/// Writes tables under `<output>/tables/`
#[derive(Debug, Clone)]
pub struct TableWriter {
    root: PathBuf,
    run_id: String,
}

impl TableWriter {
    pub fn new(output: impl AsRef<Path>, run_id: impl Into<String>) -> Self {
        Self {
            root: output.as_ref().join(TABLES_DIR),
            run_id: run_id.into(),
        }
    }

    /// Directory every table is written under
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, spec: &TableSpec) -> PathBuf {
        self.root.join(spec.location)
    }

    /// Name of the single data file in each leaf directory
    pub fn part_file_name(&self) -> String {
        format!("part-00000-{}.snappy.parquet", self.run_id)
    }

    /// Write a table at its standard location
    pub fn write_table<T: WritableTable>(
        &self,
        rows: &Partitioned<T>,
    ) -> Result<TableWriteStats, ExportError> {
        self.write::<T>(rows, &T::SPEC)
    }

    /// Write `rows` to `spec.location`, replacing whatever is there
    pub fn write<T: TableRow>(
        &self,
        rows: &Partitioned<T>,
        spec: &TableSpec,
    ) -> Result<TableWriteStats, ExportError> {
        let start = Instant::now();
        let span = tracing::info_span!("write_table", table = T::TABLE);
        let _guard = span.enter();

        check_partition_columns::<T>(spec.partition_by)?;

        let target = self.table_path(spec);
        let staging = self.root.join(format!(".{}.staging-{}", spec.location, self.run_id));

        let groups = group_rows(rows, spec.partition_by);
        debug!(
            rows = rows.len(),
            groups = groups.len(),
            staging = %staging.display(),
            "Writing table to staging directory"
        );

        let files = match self.write_staged::<T>(&staging, &groups, spec.partition_by) {
            Ok(files) => files,
            Err(e) => {
                remove_quietly(&staging);
                return Err(e);
            }
        };

        self.swap_into_place(&staging, &target)?;

        let stats = TableWriteStats {
            table: T::TABLE.to_string(),
            rows: rows.len(),
            files,
            partitions: if spec.partition_by.is_empty() {
                0
            } else {
                groups.len()
            },
            path: target,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            table = %stats.table,
            rows = stats.rows,
            files = stats.files,
            partitions = stats.partitions,
            path = %stats.path.display(),
            "Table written"
        );

        Ok(stats)
    }

    fn write_staged<T: TableRow>(
        &self,
        staging: &Path,
        groups: &BTreeMap<Vec<String>, Vec<&T>>,
        partition_by: &[&str],
    ) -> Result<usize, ExportError> {
        if staging.exists() {
            fs::remove_dir_all(staging).map_err(|e| ExportError::write_failure(staging, e))?;
        }
        fs::create_dir_all(staging).map_err(|e| ExportError::write_failure(staging, e))?;

        let schema = T::schema();
        let keep: Vec<usize> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| !partition_by.contains(&field.name().as_str()))
            .map(|(index, _)| index)
            .collect();

        let mut files = 0;
        for (segments, rows) in groups {
            let dir = segments.iter().fold(staging.to_path_buf(), |dir, s| dir.join(s));
            fs::create_dir_all(&dir).map_err(|e| ExportError::write_failure(&dir, e))?;

            let batch = T::to_record_batch(rows)?.project(&keep)?;
            write_parquet(&dir.join(self.part_file_name()), &batch)?;
            files += 1;
        }

        let marker = staging.join(SUCCESS_MARKER);
        File::create(&marker).map_err(|e| ExportError::write_failure(&marker, e))?;

        Ok(files)
    }

    /// Replace `target` with the fully written `staging` directory
    fn swap_into_place(&self, staging: &Path, target: &Path) -> Result<(), ExportError> {
        let previous = self.root.join(format!(
            ".{}.previous-{}",
            target
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            self.run_id
        ));

        let had_previous = target.exists();
        if had_previous {
            if let Err(e) = fs::rename(target, &previous) {
                remove_quietly(staging);
                return Err(ExportError::write_failure(target, e));
            }
        }

        if let Err(e) = fs::rename(staging, target) {
            if had_previous {
                if let Err(restore) = fs::rename(&previous, target) {
                    warn!(
                        path = %previous.display(),
                        error = %restore,
                        "Failed to restore previous table"
                    );
                }
            }
            remove_quietly(staging);
            return Err(ExportError::write_failure(target, e));
        }

        if had_previous {
            remove_quietly(&previous);
        }
        Ok(())
    }
}

/// Reject partition columns the table cannot encode in a path
fn check_partition_columns<T: TableRow>(partition_by: &[&str]) -> Result<(), ExportError> {
    match partition_by
        .iter()
        .find(|column| !T::PARTITION_COLUMNS.contains(*column))
    {
        Some(column) => Err(ExportError::UnsupportedPartitionColumn {
            table: T::TABLE.to_string(),
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

/// Group rows by their partition directory segments
///
/// An unpartitioned table yields exactly one group, even when empty, so that
/// a file carrying the schema is always written.
fn group_rows<'a, T: TableRow>(
    rows: &'a Partitioned<T>,
    partition_by: &[&str],
) -> BTreeMap<Vec<String>, Vec<&'a T>> {
    let mut groups: BTreeMap<Vec<String>, Vec<&T>> = BTreeMap::new();
    if partition_by.is_empty() {
        groups.insert(Vec::new(), rows.iter().collect());
        return groups;
    }

    for row in rows.iter() {
        let segments = partition_by
            .iter()
            .map(|column| partition_segment(column, row.partition_value(column).as_deref()))
            .collect();
        groups.entry(segments).or_default().push(row);
    }
    groups
}

/// `column=value` directory name for one partition value
pub fn partition_segment(column: &str, value: Option<&str>) -> String {
    match value {
        Some(value) if !value.is_empty() => format!("{}={}", column, escape_path_name(value)),
        _ => format!("{}={}", column, DEFAULT_PARTITION),
    }
}

/// Percent-escape characters that are unsafe in a path segment
pub fn escape_path_name(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            escaped.push_str(&format!("%{:02X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

fn needs_escape(c: char) -> bool {
    matches!(
        c,
        '"' | '#' | '%' | '\'' | '*' | '/' | ':' | '=' | '?' | '\\' | '^' | '[' | ']' | '{' | '\u{7F}'
    ) || c.is_ascii_control()
}

fn write_parquet(path: &Path, batch: &arrow::record_batch::RecordBatch) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::write_failure(path, e))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_dir_all(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove directory");
        }
    }
}
