//! Integration tests for the full ETL pipeline
//!
//! Tests the complete workflow: source discovery → table derivation →
//! partitioned Parquet output → run manifest

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use arrow::array::{Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tempfile::TempDir;

use songplay_etl::pipeline::{
    PipelineConfig, PipelineError, PipelineStage, PipelineStatus, RunManifest, run_pipeline,
};
use songplay_etl::transform::split_key;

const PLAY_TS: i64 = 1543537327796;

/// Helper to write one song record file in the song_data layout
fn write_song(input: &Path, name: &str, song_id: &str, artist_id: &str, artist: &str, title: &str, year: i64) {
    let dir = input.join("song_data/A/B/C");
    fs::create_dir_all(&dir).expect("Failed to create song dir");
    let mut file = File::create(dir.join(format!("{name}.json"))).expect("Failed to create song file");
    writeln!(
        file,
        r#"{{"num_songs": 1, "artist_id": "{artist_id}", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "{artist}", "song_id": "{song_id}", "title": "{title}", "duration": 218.93179, "year": {year}}}"#
    )
    .expect("Failed to write song");
}

/// Helper to write log events (JSON Lines) in the log_data layout
fn write_logs(input: &Path, name: &str, lines: &[String]) {
    let dir = input.join("log_data/2018/11");
    fs::create_dir_all(&dir).expect("Failed to create log dir");
    let mut file = File::create(dir.join(format!("{name}.json"))).expect("Failed to create log file");
    for line in lines {
        writeln!(file, "{line}").expect("Failed to write log line");
    }
}

fn play(artist: &str, song: &str, user_id: u32, level: &str, ts: i64) -> String {
    format!(
        r#"{{"artist": "{artist}", "auth": "Logged In", "firstName": "Sylvie", "gender": "F", "itemInSession": 0, "lastName": "Cruz", "length": 218.9, "level": "{level}", "location": "Washington-Arlington-Alexandria, DC-VA-MD-WV", "method": "PUT", "page": "NextSong", "registration": 1540266185796.0, "sessionId": 345, "song": "{song}", "status": 200, "ts": {ts}, "userAgent": "Mozilla/5.0", "userId": "{user_id}"}}"#
    )
}

fn page_view(page: &str, ts: i64) -> String {
    format!(
        r#"{{"artist": null, "auth": "Logged In", "firstName": "Ryan", "gender": "M", "level": "free", "page": "{page}", "sessionId": 7, "song": null, "ts": {ts}, "userId": "26"}}"#
    )
}

fn config(input: &Path, output: &Path) -> PipelineConfig {
    PipelineConfig::new()
        .with_input(input.display().to_string())
        .with_output(output.display().to_string())
        .with_workers(2)
}

/// Collect every parquet file under a table directory
fn part_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).expect("Failed to read table dir") {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(part_files(&path));
        } else if path.extension().is_some_and(|ext| ext == "parquet") {
            files.push(path);
        }
    }
    files.sort();
    files
}

fn read_table(dir: &Path) -> Vec<RecordBatch> {
    part_files(dir)
        .iter()
        .flat_map(|path| {
            let file = File::open(path).unwrap();
            ParquetRecordBatchReaderBuilder::try_new(file)
                .unwrap()
                .build()
                .unwrap()
                .map(|batch| batch.unwrap())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn row_count(batches: &[RecordBatch]) -> usize {
    batches.iter().map(RecordBatch::num_rows).sum()
}

fn string_column(batches: &[RecordBatch], name: &str) -> Vec<Option<String>> {
    let mut values = Vec::new();
    for batch in batches {
        let column = batch
            .column_by_name(name)
            .unwrap_or_else(|| panic!("missing column {name}"))
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        for i in 0..column.len() {
            values.push(column.is_valid(i).then(|| column.value(i).to_string()));
        }
    }
    values
}

#[test]
fn test_full_pipeline_builds_every_table() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let input = temp.path().join("input");
    let output = temp.path().join("output");

    write_song(&input, "TRAAAAW128F429D538", "S1", "A1", "Muse", "Hysteria", 2003);
    write_song(&input, "TRAAABD128F429CF47", "S1", "A1", "Muse", "Hysteria", 2003);
    write_logs(
        &input,
        "2018-11-30-events",
        &[
            play("Muse", "Hysteria", 10, "paid", PLAY_TS),
            play("Unknown", "Hysteria", 10, "paid", PLAY_TS + 1000),
            play("Muse", "Hysteria", 10, "paid", PLAY_TS),
            page_view("Home", PLAY_TS + 2000),
            "{not json".to_string(),
        ],
    );

    let report = run_pipeline(config(&input, &output).with_partitions(3)).unwrap();
    assert!(report.is_success());
    assert_eq!(report.status, PipelineStatus::Completed);
    assert_eq!(
        report.stages_completed,
        vec![PipelineStage::Songs, PipelineStage::Logs]
    );
    assert_eq!(report.records_skipped(), 1);

    assert_eq!(report.table("songs").unwrap().rows, 1);
    assert_eq!(report.table("artists").unwrap().rows, 1);
    assert_eq!(report.table("users").unwrap().rows, 1);
    assert_eq!(report.table("times").unwrap().rows, 2);
    assert_eq!(report.table("songplays").unwrap().rows, 2);

    let tables = output.join("tables");
    for table in [
        "songs.parquet",
        "artists.parquet",
        "users.parquet",
        "times.parquet",
        "songplays.parquet",
    ] {
        assert!(tables.join(table).join("_SUCCESS").exists(), "{table}");
    }
    assert!(tables.join("songs.parquet/year=2003/artist_id=A1").is_dir());
    assert!(tables.join("times.parquet/year=2018/month=11").is_dir());
    assert!(tables.join("songplays.parquet/year=2018/month=11").is_dir());

    let songplays = read_table(&tables.join("songplays.parquet"));
    assert_eq!(row_count(&songplays), 2);
    assert!(songplays[0].column_by_name("year").is_none());
    assert!(songplays[0].column_by_name("month").is_none());

    let mut song_ids = string_column(&songplays, "song_id");
    song_ids.sort();
    assert_eq!(song_ids, vec![None, Some("S1".to_string())]);
    assert!(
        string_column(&songplays, "level")
            .iter()
            .all(|level| level.as_deref() == Some("paid"))
    );

    let manifest = RunManifest::load(&tables.join("_manifest.json")).unwrap();
    assert_eq!(manifest.run_id, report.run_id);
    assert_eq!(manifest.status, PipelineStatus::Completed);
    assert_eq!(manifest.tables.len(), 5);
    assert_eq!(manifest.sources["log_data"].records_skipped, 1);
    assert_eq!(manifest.sources["song_data"].files_processed, 2);
}

#[test]
fn test_songplay_ids_unique_for_any_partition_count() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let input = temp.path().join("input");

    write_song(&input, "TR1", "S1", "A1", "Muse", "Hysteria", 2003);
    let lines: Vec<String> = (0..60)
        .map(|i| {
            let (artist, song) = if i % 2 == 0 {
                ("Muse", "Hysteria")
            } else {
                ("Nobody", "Nothing")
            };
            play(artist, song, 10 + i % 4, "free", PLAY_TS + i as i64)
        })
        .collect();
    write_logs(&input, "events", &lines);

    for partitions in [1, 2, 7] {
        let output = temp.path().join(format!("out-{partitions}"));
        let report = run_pipeline(config(&input, &output).with_partitions(partitions)).unwrap();
        assert_eq!(report.table("songplays").unwrap().rows, 60);

        let songplays = read_table(&output.join("tables/songplays.parquet"));
        let mut ids: Vec<i64> = songplays
            .iter()
            .flat_map(|batch| {
                let column = batch
                    .column_by_name("songplay_id")
                    .unwrap()
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .unwrap();
                column.values().to_vec()
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 60);
        assert!(ids.iter().all(|id| split_key(*id).0 < partitions));

        let matched = string_column(&songplays, "song_id")
            .iter()
            .filter(|id| id.is_some())
            .count();
        assert_eq!(matched, 30);
    }
}

#[test]
fn test_tie_break_picks_smallest_song_id() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let input = temp.path().join("input");

    write_song(&input, "TR1", "S2", "A2", "Muse", "Hysteria", 2003);
    write_song(&input, "TR2", "S1", "A1", "Muse", "Hysteria", 2003);
    write_logs(&input, "events", &[play("Muse", "Hysteria", 10, "paid", PLAY_TS)]);

    for partitions in [1, 5] {
        let output = temp.path().join(format!("out-{partitions}"));
        run_pipeline(
            config(&input, &output)
                .with_partitions(partitions)
                .with_stages(vec![PipelineStage::Logs]),
        )
        .unwrap();

        let songplays = read_table(&output.join("tables/songplays.parquet"));
        assert_eq!(string_column(&songplays, "song_id"), vec![Some("S1".to_string())]);
        assert_eq!(string_column(&songplays, "artist_id"), vec![Some("A1".to_string())]);
    }
}

#[test]
fn test_rerun_replaces_previous_output() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let input = temp.path().join("input");
    let output = temp.path().join("output");

    write_song(&input, "TR1", "S1", "A1", "Muse", "Hysteria", 2003);
    write_logs(&input, "events", &[play("Muse", "Hysteria", 10, "paid", PLAY_TS)]);
    let first = run_pipeline(config(&input, &output)).unwrap();

    let songs = output.join("tables/songs.parquet");
    assert!(songs.join("year=2003").is_dir());

    write_song(&input, "TR1", "S1", "A1", "Muse", "Hysteria", 1999);
    let second = run_pipeline(config(&input, &output)).unwrap();
    assert_ne!(first.run_id, second.run_id);

    assert!(!songs.join("year=2003").exists());
    assert!(songs.join("year=1999/artist_id=A1").is_dir());
    assert_eq!(part_files(&songs).len(), 1);
    assert_eq!(row_count(&read_table(&songs)), 1);

    let manifest = RunManifest::load(&output.join("tables/_manifest.json")).unwrap();
    assert_eq!(manifest.run_id, second.run_id);
}

#[test]
fn test_songs_stage_only() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let input = temp.path().join("input");
    let output = temp.path().join("output");

    write_song(&input, "TR1", "S1", "A1", "Muse", "Hysteria", 2003);

    let report = run_pipeline(
        config(&input, &output).with_stages(vec![PipelineStage::Songs]),
    )
    .unwrap();
    assert_eq!(report.tables.len(), 2);
    assert!(output.join("tables/songs.parquet").is_dir());
    assert!(output.join("tables/artists.parquet/_SUCCESS").exists());
    assert!(!output.join("tables/users.parquet").exists());
}

#[test]
fn test_empty_log_source_writes_empty_tables() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let input = temp.path().join("input");
    let output = temp.path().join("output");

    write_song(&input, "TR1", "S1", "A1", "Muse", "Hysteria", 2003);
    write_logs(&input, "events", &[page_view("Home", PLAY_TS)]);

    let report = run_pipeline(config(&input, &output)).unwrap();
    assert_eq!(report.table("users").unwrap().rows, 0);
    assert_eq!(report.table("songplays").unwrap().rows, 0);

    let users = read_table(&output.join("tables/users.parquet"));
    assert_eq!(row_count(&users), 0);
    assert!(output.join("tables/songplays.parquet/_SUCCESS").exists());
}

#[test]
fn test_missing_input_is_source_unavailable() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let output = temp.path().join("output");

    let err = run_pipeline(config(&temp.path().join("missing"), &output)).unwrap_err();
    assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    assert!(err.is_fatal());
    assert!(!output.join("tables/_manifest.json").exists());
}

#[test]
fn test_remote_input_is_source_unavailable() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = PipelineConfig::new()
        .with_input("s3a://udacity-dend/")
        .with_output(temp.path().join("output").display().to_string());

    let err = run_pipeline(config).unwrap_err();
    match err {
        PipelineError::SourceUnavailable { location, .. } => {
            assert_eq!(location, "s3a://udacity-dend/")
        }
        other => panic!("unexpected error: {other}"),
    }
}
