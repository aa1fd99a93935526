//! Table derivation
//!
//! Builders that turn partitioned source records into the four dimension
//! tables and the songplays fact table.

pub mod activity;
pub mod catalog;
pub mod dedup;
pub mod error;
pub mod keys;
pub mod songplays;
pub mod time;

pub use activity::{build_users, filter_song_plays};
pub use catalog::{CatalogTables, build_artists, build_catalog, build_songs};
pub use dedup::dedup_rows;
pub use error::TransformError;
pub use keys::{KeyAllocator, MAX_PARTITIONS, split_key, surrogate_key};
pub use songplays::build_songplays;
pub use time::{WeekStart, build_times, decompose, event_timestamp};
