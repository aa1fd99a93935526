//! Songplays fact table
//!
//! Play events and catalog records share no foreign key. They are matched on
//! `(log.artist, log.song) == (song.artist_name, song.title)` with exact,
//! case-sensitive string equality; a null on either side never matches.
//!
//! The join is a left outer join: every deduplicated play yields exactly one
//! fact row. When several catalog rows share a key, the one with the smallest
//! `song_id` wins (then the smallest `artist_id`; missing ids sort last), so
//! the join never fans out and the choice does not depend on input order.
//!
//! Both sides are shuffled by join key into the session's shuffle partitions.
//! Each partition then joins locally and numbers its rows with
//! [`KeyAllocator`], which needs no coordination between partitions.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Datelike, Utc};

use super::dedup::dedup_rows;
use super::error::TransformError;
use super::keys::KeyAllocator;
use super::time::event_timestamp;
use crate::execution::{ExecutionSession, Partitioned};
use crate::models::{LogEvent, RowIdentity, SongRecord, SongplayFact};

/// A song-play event projected for the join
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayRow {
    pub artist: Option<String>,
    pub song: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub level: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    pub month: Option<i32>,
    pub year: Option<i32>,
}

impl PlayRow {
    pub fn from_event(event: &LogEvent) -> Self {
        let start_time = event.ts.and_then(event_timestamp);
        Self {
            artist: event.artist.clone(),
            song: event.song.clone(),
            start_time,
            user_id: event.user_id.clone(),
            level: event.level.clone(),
            session_id: event.session_id,
            location: event.location.clone(),
            user_agent: event.user_agent.clone(),
            month: start_time.map(|t| t.month() as i32),
            year: start_time.map(|t| t.year()),
        }
    }

    fn join_key(&self) -> (Option<&str>, Option<&str>) {
        (self.artist.as_deref(), self.song.as_deref())
    }
}

impl RowIdentity for PlayRow {
    type Key = PlayRow;

    fn identity(&self) -> Self::Key {
        self.clone()
    }
}

/// A catalog record projected for the join
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogMatch {
    pub artist_name: Option<String>,
    pub artist_id: Option<String>,
    pub title: Option<String>,
    pub song_id: Option<String>,
}

impl CatalogMatch {
    pub fn from_record(record: &SongRecord) -> Self {
        Self {
            artist_name: record.artist_name.clone(),
            artist_id: record.artist_id.clone(),
            title: record.title.clone(),
            song_id: record.song_id.clone(),
        }
    }

    fn join_key(&self) -> (Option<&str>, Option<&str>) {
        (self.artist_name.as_deref(), self.title.as_deref())
    }

    /// Ordering used to pick one match among several: smallest `song_id`,
    /// then smallest `artist_id`, with missing ids last
    fn rank(&self) -> ((bool, &str), (bool, &str)) {
        (id_rank(&self.song_id), id_rank(&self.artist_id))
    }
}

impl RowIdentity for CatalogMatch {
    type Key = CatalogMatch;

    fn identity(&self) -> Self::Key {
        self.clone()
    }
}

fn id_rank(id: &Option<String>) -> (bool, &str) {
    (id.is_none(), id.as_deref().unwrap_or(""))
}

/// Catalog lookup for one partition, one winner per join key
#[derive(Debug, Default)]
pub struct CatalogIndex<'a> {
    matches: HashMap<(&'a str, &'a str), &'a CatalogMatch>,
}

impl<'a> CatalogIndex<'a> {
    pub fn build(rows: &'a [CatalogMatch]) -> Self {
        let mut matches: HashMap<(&str, &str), &CatalogMatch> = HashMap::new();
        for row in rows {
            let (Some(artist), Some(title)) = row.join_key() else {
                continue;
            };
            match matches.entry((artist, title)) {
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
                Entry::Occupied(mut slot) => {
                    if row.rank() < slot.get().rank() {
                        slot.insert(row);
                    }
                }
            }
        }
        Self { matches }
    }

    pub fn lookup(&self, artist: Option<&str>, song: Option<&str>) -> Option<&'a CatalogMatch> {
        let (Some(artist), Some(song)) = (artist, song) else {
            return None;
        };
        self.matches.get(&(artist, song)).copied()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Left-join one partition of plays against its catalog rows and assign keys
pub fn join_partition(
    partition: usize,
    plays: Vec<PlayRow>,
    catalog: Vec<CatalogMatch>,
) -> Result<Vec<SongplayFact>, TransformError> {
    let index = CatalogIndex::build(&catalog);
    let mut keys = KeyAllocator::new(partition);

    let mut facts = Vec::with_capacity(plays.len());
    for play in plays {
        let (artist, song) = play.join_key();
        let matched = index.lookup(artist, song);
        facts.push(SongplayFact {
            songplay_id: keys.next_key()?,
            start_time: play.start_time,
            user_id: play.user_id,
            level: play.level,
            song_id: matched.and_then(|m| m.song_id.clone()),
            artist_id: matched.and_then(|m| m.artist_id.clone()),
            session_id: play.session_id,
            location: play.location,
            user_agent: play.user_agent,
            month: play.month,
            year: play.year,
        });
    }

    // A key belongs to one partition, so a per-partition pass is global.
    Ok(dedup_rows(facts))
}

/// Build the songplays fact table
///
/// `plays` must already be filtered to song-play events; `songs` is the full
/// catalog read.
pub fn build_songplays(
    session: &ExecutionSession,
    plays: &Partitioned<LogEvent>,
    songs: &Partitioned<SongRecord>,
) -> Result<Partitioned<SongplayFact>, TransformError> {
    let partitions = session.shuffle_partitions();

    let play_rows = plays
        .filter_map(session, |event| Some(PlayRow::from_event(event)))
        .distinct(session)
        .repartition_by(session, partitions, |row| {
            let (artist, song) = row.join_key();
            (artist.map(str::to_owned), song.map(str::to_owned))
        });

    let catalog = songs
        .filter_map(session, |record| Some(CatalogMatch::from_record(record)))
        .distinct(session)
        .repartition_by(session, partitions, |row| {
            let (artist, title) = row.join_key();
            (artist.map(str::to_owned), title.map(str::to_owned))
        });

    let facts = play_rows.try_zip_partitions(catalog, session, join_partition)?;

    let matched = facts.iter().filter(|fact| fact.song_id.is_some()).count();
    tracing::info!(
        rows = facts.len(),
        matched,
        unmatched = facts.len() - matched,
        partitions,
        "Songplays joined"
    );

    Ok(facts)
}
