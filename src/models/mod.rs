//! Record and table models
//!
//! Raw source records as read from JSON, and the star-schema rows derived
//! from them.

pub mod identity;
pub mod records;
pub mod tables;

pub use identity::{RowIdentity, canonical_f64_bits};
pub use records::{LogEvent, NEXT_SONG_PAGE, SongRecord};
pub use tables::{ArtistDim, SongDim, SongplayFact, TimeDim, UserDim};
