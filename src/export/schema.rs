//! Arrow schemas for the star-schema tables
//!
//! Each table row type knows its Arrow schema, how to turn a slice of rows
//! into a [`RecordBatch`] and which of its columns may be used as a
//! directory partition.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};

use crate::models::{ArtistDim, SongDim, SongplayFact, TimeDim, UserDim};

/// Timezone attached to every timestamp column
pub const TIMESTAMP_TZ: &str = "UTC";

/// A row type that can be written as a columnar table
pub trait TableRow: Sized {
    /// Table name used in logs and errors
    const TABLE: &'static str;

    /// Columns whose values can be encoded in a partition directory name
    const PARTITION_COLUMNS: &'static [&'static str];

    fn schema() -> SchemaRef;

    fn to_record_batch(rows: &[&Self]) -> Result<RecordBatch, ArrowError>;

    /// Text form of a partition column's value, `None` when null
    ///
    /// Only called with names from [`PARTITION_COLUMNS`](Self::PARTITION_COLUMNS).
    fn partition_value(&self, column: &str) -> Option<String>;
}

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some(TIMESTAMP_TZ.into()))
}

fn timestamps<'a>(values: impl Iterator<Item = Option<&'a DateTime<Utc>>>) -> TimestampMillisecondArray {
    values
        .map(|t| t.map(DateTime::timestamp_millis))
        .collect::<TimestampMillisecondArray>()
        .with_timezone(TIMESTAMP_TZ)
}

fn batch(schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_new(schema, columns)
}

impl TableRow for SongDim {
    const TABLE: &'static str = "songs";
    const PARTITION_COLUMNS: &'static [&'static str] = &["song_id", "title", "artist_id", "year"];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("song_id", DataType::Utf8, true),
            Field::new("title", DataType::Utf8, true),
            Field::new("artist_id", DataType::Utf8, true),
            Field::new("year", DataType::Int64, true),
            Field::new("duration", DataType::Float64, true),
        ]))
    }

    fn to_record_batch(rows: &[&Self]) -> Result<RecordBatch, ArrowError> {
        let song_id: StringArray = rows.iter().map(|r| r.song_id.as_deref()).collect();
        let title: StringArray = rows.iter().map(|r| r.title.as_deref()).collect();
        let artist_id: StringArray = rows.iter().map(|r| r.artist_id.as_deref()).collect();
        let year: Int64Array = rows.iter().map(|r| r.year).collect();
        let duration: Float64Array = rows.iter().map(|r| r.duration).collect();

        batch(
            Self::schema(),
            vec![
                Arc::new(song_id),
                Arc::new(title),
                Arc::new(artist_id),
                Arc::new(year),
                Arc::new(duration),
            ],
        )
    }

    fn partition_value(&self, column: &str) -> Option<String> {
        match column {
            "song_id" => self.song_id.clone(),
            "title" => self.title.clone(),
            "artist_id" => self.artist_id.clone(),
            "year" => self.year.map(|v| v.to_string()),
            _ => None,
        }
    }
}

impl TableRow for ArtistDim {
    const TABLE: &'static str = "artists";
    const PARTITION_COLUMNS: &'static [&'static str] = &["artist_id", "name", "location"];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("artist_id", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("location", DataType::Utf8, true),
            Field::new("latitude", DataType::Float64, true),
            Field::new("longitude", DataType::Float64, true),
        ]))
    }

    fn to_record_batch(rows: &[&Self]) -> Result<RecordBatch, ArrowError> {
        let artist_id: StringArray = rows.iter().map(|r| r.artist_id.as_deref()).collect();
        let name: StringArray = rows.iter().map(|r| r.name.as_deref()).collect();
        let location: StringArray = rows.iter().map(|r| r.location.as_deref()).collect();
        let latitude: Float64Array = rows.iter().map(|r| r.latitude).collect();
        let longitude: Float64Array = rows.iter().map(|r| r.longitude).collect();

        batch(
            Self::schema(),
            vec![
                Arc::new(artist_id),
                Arc::new(name),
                Arc::new(location),
                Arc::new(latitude),
                Arc::new(longitude),
            ],
        )
    }

    fn partition_value(&self, column: &str) -> Option<String> {
        match column {
            "artist_id" => self.artist_id.clone(),
            "name" => self.name.clone(),
            "location" => self.location.clone(),
            _ => None,
        }
    }
}

impl TableRow for UserDim {
    const TABLE: &'static str = "users";
    const PARTITION_COLUMNS: &'static [&'static str] =
        &["user_id", "first_name", "last_name", "gender", "level"];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("user_id", DataType::Utf8, true),
            Field::new("first_name", DataType::Utf8, true),
            Field::new("last_name", DataType::Utf8, true),
            Field::new("gender", DataType::Utf8, true),
            Field::new("level", DataType::Utf8, true),
        ]))
    }

    fn to_record_batch(rows: &[&Self]) -> Result<RecordBatch, ArrowError> {
        let user_id: StringArray = rows.iter().map(|r| r.user_id.as_deref()).collect();
        let first_name: StringArray = rows.iter().map(|r| r.first_name.as_deref()).collect();
        let last_name: StringArray = rows.iter().map(|r| r.last_name.as_deref()).collect();
        let gender: StringArray = rows.iter().map(|r| r.gender.as_deref()).collect();
        let level: StringArray = rows.iter().map(|r| r.level.as_deref()).collect();

        batch(
            Self::schema(),
            vec![
                Arc::new(user_id),
                Arc::new(first_name),
                Arc::new(last_name),
                Arc::new(gender),
                Arc::new(level),
            ],
        )
    }

    fn partition_value(&self, column: &str) -> Option<String> {
        match column {
            "user_id" => self.user_id.clone(),
            "first_name" => self.first_name.clone(),
            "last_name" => self.last_name.clone(),
            "gender" => self.gender.clone(),
            "level" => self.level.clone(),
            _ => None,
        }
    }
}

impl TableRow for TimeDim {
    const TABLE: &'static str = "times";
    const PARTITION_COLUMNS: &'static [&'static str] =
        &["hour", "day", "week", "month", "year", "weekday"];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("start_time", timestamp_type(), false),
            Field::new("hour", DataType::Int32, false),
            Field::new("day", DataType::Int32, false),
            Field::new("week", DataType::Int32, false),
            Field::new("month", DataType::Int32, false),
            Field::new("year", DataType::Int32, false),
            Field::new("weekday", DataType::Int32, false),
        ]))
    }

    fn to_record_batch(rows: &[&Self]) -> Result<RecordBatch, ArrowError> {
        let start_time = timestamps(rows.iter().map(|r| Some(&r.start_time)));
        let hour: Int32Array = rows.iter().map(|r| Some(r.hour)).collect();
        let day: Int32Array = rows.iter().map(|r| Some(r.day)).collect();
        let week: Int32Array = rows.iter().map(|r| Some(r.week)).collect();
        let month: Int32Array = rows.iter().map(|r| Some(r.month)).collect();
        let year: Int32Array = rows.iter().map(|r| Some(r.year)).collect();
        let weekday: Int32Array = rows.iter().map(|r| Some(r.weekday)).collect();

        batch(
            Self::schema(),
            vec![
                Arc::new(start_time),
                Arc::new(hour),
                Arc::new(day),
                Arc::new(week),
                Arc::new(month),
                Arc::new(year),
                Arc::new(weekday),
            ],
        )
    }

    fn partition_value(&self, column: &str) -> Option<String> {
        let value = match column {
            "hour" => self.hour,
            "day" => self.day,
            "week" => self.week,
            "month" => self.month,
            "year" => self.year,
            "weekday" => self.weekday,
            _ => return None,
        };
        Some(value.to_string())
    }
}

impl TableRow for SongplayFact {
    const TABLE: &'static str = "songplays";
    const PARTITION_COLUMNS: &'static [&'static str] = &[
        "user_id",
        "level",
        "song_id",
        "artist_id",
        "session_id",
        "location",
        "month",
        "year",
    ];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("songplay_id", DataType::Int64, false),
            Field::new("start_time", timestamp_type(), true),
            Field::new("user_id", DataType::Utf8, true),
            Field::new("level", DataType::Utf8, true),
            Field::new("song_id", DataType::Utf8, true),
            Field::new("artist_id", DataType::Utf8, true),
            Field::new("session_id", DataType::Int64, true),
            Field::new("location", DataType::Utf8, true),
            Field::new("user_agent", DataType::Utf8, true),
            Field::new("month", DataType::Int32, true),
            Field::new("year", DataType::Int32, true),
        ]))
    }

    fn to_record_batch(rows: &[&Self]) -> Result<RecordBatch, ArrowError> {
        let songplay_id: Int64Array = rows.iter().map(|r| Some(r.songplay_id)).collect();
        let start_time = timestamps(rows.iter().map(|r| r.start_time.as_ref()));
        let user_id: StringArray = rows.iter().map(|r| r.user_id.as_deref()).collect();
        let level: StringArray = rows.iter().map(|r| r.level.as_deref()).collect();
        let song_id: StringArray = rows.iter().map(|r| r.song_id.as_deref()).collect();
        let artist_id: StringArray = rows.iter().map(|r| r.artist_id.as_deref()).collect();
        let session_id: Int64Array = rows.iter().map(|r| r.session_id).collect();
        let location: StringArray = rows.iter().map(|r| r.location.as_deref()).collect();
        let user_agent: StringArray = rows.iter().map(|r| r.user_agent.as_deref()).collect();
        let month: Int32Array = rows.iter().map(|r| r.month).collect();
        let year: Int32Array = rows.iter().map(|r| r.year).collect();

        batch(
            Self::schema(),
            vec![
                Arc::new(songplay_id),
                Arc::new(start_time),
                Arc::new(user_id),
                Arc::new(level),
                Arc::new(song_id),
                Arc::new(artist_id),
                Arc::new(session_id),
                Arc::new(location),
                Arc::new(user_agent),
                Arc::new(month),
                Arc::new(year),
            ],
        )
    }

    fn partition_value(&self, column: &str) -> Option<String> {
        match column {
            "user_id" => self.user_id.clone(),
            "level" => self.level.clone(),
            "song_id" => self.song_id.clone(),
            "artist_id" => self.artist_id.clone(),
            "session_id" => self.session_id.map(|v| v.to_string()),
            "location" => self.location.clone(),
            "month" => self.month.map(|v| v.to_string()),
            "year" => self.year.map(|v| v.to_string()),
            _ => None,
        }
    }
}
