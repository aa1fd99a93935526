//! Raw source records
//!
//! Both record types are explicit schemas over schema-loose JSON. Every field
//! is optional: a missing key and an explicit `null` both become `None`, and
//! keys that are not part of the schema are ignored.

use serde::{Deserialize, Deserializer, Serialize};

/// Page value that marks a log event as an actual song play
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// A catalog metadata record from `song_data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SongRecord {
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
    pub year: Option<i64>,
    pub duration: Option<f64>,
}

/// A user-activity record from `log_data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub page: Option<String>,
    pub artist: Option<String>,
    pub song: Option<String>,
    /// Event time in epoch milliseconds
    pub ts: Option<i64>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl LogEvent {
    /// Check if this event represents a song play
    pub fn is_song_play(&self) -> bool {
        self.page.as_deref() == Some(NEXT_SONG_PAGE)
    }
}

/// Accept either a JSON string or a JSON number, keeping the text form
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_record_missing_fields_are_none() {
        let record: SongRecord =
            serde_json::from_str(r#"{"song_id": "S1", "num_songs": 1, "artist_latitude": null}"#)
                .unwrap();
        assert_eq!(record.song_id.as_deref(), Some("S1"));
        assert!(record.title.is_none());
        assert!(record.artist_latitude.is_none());
    }

    #[test]
    fn test_log_event_camel_case_fields() {
        let event: LogEvent = serde_json::from_str(
            r#"{"userId": "10", "firstName": "Ada", "sessionId": 5, "userAgent": "x", "ts": 1543537327796, "page": "NextSong"}"#,
        )
        .unwrap();
        assert_eq!(event.user_id.as_deref(), Some("10"));
        assert_eq!(event.first_name.as_deref(), Some("Ada"));
        assert_eq!(event.session_id, Some(5));
        assert_eq!(event.ts, Some(1543537327796));
        assert!(event.is_song_play());
    }

    #[test]
    fn test_log_event_numeric_user_id() {
        let event: LogEvent = serde_json::from_str(r#"{"userId": 42}"#).unwrap();
        assert_eq!(event.user_id.as_deref(), Some("42"));

        let event: LogEvent = serde_json::from_str(r#"{"userId": null}"#).unwrap();
        assert!(event.user_id.is_none());
    }

    #[test]
    fn test_page_filter_is_case_sensitive() {
        let event = LogEvent {
            page: Some("nextsong".to_string()),
            ..Default::default()
        };
        assert!(!event.is_song_play());
        assert!(!LogEvent::default().is_song_play());
    }
}
