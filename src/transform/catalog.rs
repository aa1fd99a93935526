//! Songs and artists dimensions

use crate::execution::{ExecutionSession, Partitioned};
use crate::models::{ArtistDim, SongDim, SongRecord};

/// Dimensions derived from catalog song records
#[derive(Debug)]
pub struct CatalogTables {
    pub songs: Partitioned<SongDim>,
    pub artists: Partitioned<ArtistDim>,
}

/// Build both catalog dimensions
pub fn build_catalog(
    session: &ExecutionSession,
    records: &Partitioned<SongRecord>,
) -> CatalogTables {
    CatalogTables {
        songs: build_songs(session, records),
        artists: build_artists(session, records),
    }
}

pub fn build_songs(
    session: &ExecutionSession,
    records: &Partitioned<SongRecord>,
) -> Partitioned<SongDim> {
    records
        .filter_map(session, |record| {
            Some(SongDim {
                song_id: record.song_id.clone(),
                title: record.title.clone(),
                artist_id: record.artist_id.clone(),
                year: record.year,
                duration: record.duration,
            })
        })
        .distinct(session)
}

/// Artist rows are deduplicated full-row, so an artist recorded with
/// different locations keeps one row per variant.
pub fn build_artists(
    session: &ExecutionSession,
    records: &Partitioned<SongRecord>,
) -> Partitioned<ArtistDim> {
    records
        .filter_map(session, |record| {
            Some(ArtistDim {
                artist_id: record.artist_id.clone(),
                name: record.artist_name.clone(),
                location: record.artist_location.clone(),
                latitude: record.artist_latitude,
                longitude: record.artist_longitude,
            })
        })
        .distinct(session)
}
