//! Star-schema table rows
//!
//! Four dimension tables (songs, artists, users, time) and one fact table
//! (songplays). Every row type implements [`RowIdentity`] over all of its
//! columns so that tables can be deduplicated full-row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::{RowIdentity, canonical_opt_f64};

/// Songs dimension row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongDim {
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub year: Option<i64>,
    pub duration: Option<f64>,
}

impl RowIdentity for SongDim {
    type Key = (
        Option<String>,
        Option<String>,
        Option<String>,
        Option<i64>,
        Option<u64>,
    );

    fn identity(&self) -> Self::Key {
        (
            self.song_id.clone(),
            self.title.clone(),
            self.artist_id.clone(),
            self.year,
            canonical_opt_f64(self.duration),
        )
    }
}

/// Artists dimension row
///
/// An artist whose location or coordinates differ between catalog records
/// keeps one row per distinct variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistDim {
    pub artist_id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl RowIdentity for ArtistDim {
    type Key = (
        Option<String>,
        Option<String>,
        Option<String>,
        Option<u64>,
        Option<u64>,
    );

    fn identity(&self) -> Self::Key {
        (
            self.artist_id.clone(),
            self.name.clone(),
            self.location.clone(),
            canonical_opt_f64(self.latitude),
            canonical_opt_f64(self.longitude),
        )
    }
}

/// Users dimension row
///
/// `level` is part of the row, so a user who changed subscription tier
/// appears once per tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserDim {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

impl RowIdentity for UserDim {
    type Key = UserDim;

    fn identity(&self) -> Self::Key {
        self.clone()
    }
}

/// Time dimension row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeDim {
    pub start_time: DateTime<Utc>,
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    pub weekday: i32,
}

impl RowIdentity for TimeDim {
    type Key = TimeDim;

    fn identity(&self) -> Self::Key {
        self.clone()
    }
}

/// Songplays fact row
///
/// `song_id` and `artist_id` are `None` when the play matched no catalog
/// record. `songplay_id` is a surrogate key: unique within one run, neither
/// contiguous nor stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongplayFact {
    pub songplay_id: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    pub month: Option<i32>,
    pub year: Option<i32>,
}

impl RowIdentity for SongplayFact {
    type Key = SongplayFact;

    fn identity(&self) -> Self::Key {
        self.clone()
    }
}
