//! Time dimension
//!
//! Event timestamps are epoch milliseconds. They are converted to UTC
//! timestamps (millisecond precision kept) and decomposed into calendar
//! parts. `week` is the ISO-8601 week of year; `weekday` numbering depends
//! on [`WeekStart`].

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::execution::{ExecutionSession, Partitioned};
use crate::models::{LogEvent, TimeDim};

/// First day of the week for `weekday` numbering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// Sunday = 1 … Saturday = 7
    #[default]
    Sunday,
    /// Monday = 1 … Sunday = 7 (ISO-8601)
    Monday,
}

impl WeekStart {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sunday => "sunday",
            Self::Monday => "monday",
        }
    }

    /// Number a date's weekday from 1
    pub fn weekday_number(&self, time: &DateTime<Utc>) -> i32 {
        let weekday = time.weekday();
        match self {
            Self::Sunday => weekday.number_from_sunday() as i32,
            Self::Monday => weekday.number_from_monday() as i32,
        }
    }
}

impl std::fmt::Display for WeekStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" | "iso" => Ok(Self::Monday),
            _ => Err(format!(
                "Invalid week start: {}. Expected: sunday, monday",
                s
            )),
        }
    }
}

/// Convert epoch milliseconds to a UTC timestamp
pub fn event_timestamp(ts_millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts_millis)
}

/// Decompose a timestamp into a time dimension row
pub fn decompose(start_time: DateTime<Utc>, week_start: WeekStart) -> TimeDim {
    TimeDim {
        start_time,
        hour: start_time.hour() as i32,
        day: start_time.day() as i32,
        week: start_time.iso_week().week() as i32,
        month: start_time.month() as i32,
        year: start_time.year(),
        weekday: week_start.weekday_number(&start_time),
    }
}

/// Build the time dimension from song-play events
///
/// Events without a timestamp contribute no row.
pub fn build_times(
    session: &ExecutionSession,
    plays: &Partitioned<LogEvent>,
    week_start: WeekStart,
) -> Partitioned<TimeDim> {
    plays
        .filter_map(session, |event| {
            event
                .ts
                .and_then(event_timestamp)
                .map(|start_time| decompose(start_time, week_start))
        })
        .distinct(session)
}
