//! Song-play filter and users dimension

use crate::execution::{ExecutionSession, Partitioned};
use crate::models::{LogEvent, UserDim};

/// Keep only events whose page marks an actual song play
pub fn filter_song_plays(
    session: &ExecutionSession,
    events: &Partitioned<LogEvent>,
) -> Partitioned<LogEvent> {
    events.filter_map(session, |event| event.is_song_play().then(|| event.clone()))
}

/// Build the users dimension from song-play events
///
/// Deduplication is row-wise: a user seen on two subscription levels
/// yields two rows.
pub fn build_users(
    session: &ExecutionSession,
    plays: &Partitioned<LogEvent>,
) -> Partitioned<UserDim> {
    plays
        .filter_map(session, |event| {
            Some(UserDim {
                user_id: event.user_id.clone(),
                first_name: event.first_name.clone(),
                last_name: event.last_name.clone(),
                gender: event.gender.clone(),
                level: event.level.clone(),
            })
        })
        .distinct(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(page: &str, user_id: &str, level: &str) -> LogEvent {
        LogEvent {
            user_id: Some(user_id.to_string()),
            first_name: Some("Sylvie".to_string()),
            last_name: Some("Cruz".to_string()),
            gender: Some("F".to_string()),
            level: Some(level.to_string()),
            page: Some(page.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_drops_non_plays() {
        let session = ExecutionSession::local(1).unwrap();
        let events = Partitioned::new(vec![
            vec![event("NextSong", "10", "free"), event("Home", "11", "free")],
            vec![event("Logout", "12", "paid")],
        ]);

        let plays = filter_song_plays(&session, &events);
        assert_eq!(plays.len(), 1);
        assert_eq!(plays.num_partitions(), 2);

        let users = build_users(&session, &plays);
        let ids: Vec<_> = users.iter().map(|u| u.user_id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["10"]);
    }

    #[test]
    fn test_level_change_produces_two_rows() {
        let session = ExecutionSession::local(3).unwrap();
        let plays = Partitioned::new(vec![vec![
            event("NextSong", "10", "free"),
            event("NextSong", "10", "free"),
            event("NextSong", "10", "paid"),
        ]]);

        let users = build_users(&session, &plays);
        let mut levels: Vec<_> = users.iter().map(|u| u.level.clone().unwrap()).collect();
        levels.sort();
        assert_eq!(levels, vec!["free", "paid"]);
    }
}
