//! # Playback Data Model
//!
//! Tracks as they arrive from the catalog, the session status folded from
//! engine events, and the read-only snapshot handed to UIs.

use bridge_traits::EngineState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::queue::Queue;

/// A playable catalog entry.
///
/// `track_id` is the engine-resolvable identifier; the remaining fields are
/// display metadata carried through untouched. Field aliases accept the
/// catalog's row names (`track_name`, `album_name`, `image_url`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: String,
    #[serde(default, alias = "track_name")]
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default, alias = "album_name")]
    pub album: Option<String>,
    #[serde(default)]
    pub album_key: Option<String>,
    #[serde(default, alias = "image_url")]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl Track {
    pub fn new(track_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            title: title.into(),
            artist: None,
            artist_id: None,
            album: None,
            album_key: None,
            artwork_url: None,
            genre: None,
            duration_ms: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artwork_url(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// `true` when the identifier is non-blank. Blank tracks never reach the engine.
    pub fn is_playable(&self) -> bool {
        !self.track_id.trim().is_empty()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }
}

/// Session status as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Stalled,
    Ended,
}

impl PlaybackStatus {
    /// Map an engine state onto a session status.
    ///
    /// Returns `None` for codes outside the known enumeration; callers keep
    /// the previous status in that case.
    pub fn from_engine(state: EngineState) -> Option<Self> {
        let status = match state {
            EngineState::None | EngineState::Stopped => PlaybackStatus::Idle,
            EngineState::Loading | EngineState::Seeking => PlaybackStatus::Loading,
            EngineState::Playing => PlaybackStatus::Playing,
            EngineState::Paused => PlaybackStatus::Paused,
            EngineState::Waiting | EngineState::Stalled => PlaybackStatus::Stalled,
            EngineState::Ended | EngineState::Completed => PlaybackStatus::Ended,
            EngineState::Unknown(_) => return None,
        };
        Some(status)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Stalled => "stalled",
            PlaybackStatus::Ended => "ended",
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackStatus::Playing)
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status and timing of the active session. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub status: PlaybackStatus,
    pub current_time: f64,
    pub duration: f64,
}

impl PlaybackSession {
    pub fn reset_timing(&mut self) {
        self.current_time = 0.0;
        self.duration = 0.0;
    }
}

/// Mutable controller state guarded by the controller's state lock.
#[derive(Debug, Default)]
pub(crate) struct PlayerState {
    pub queue: Queue,
    pub session: PlaybackSession,
    pub visible: bool,
}

impl PlayerState {
    /// Replace the status, returning the previous one when it changed.
    pub fn set_status(&mut self, status: PlaybackStatus) -> Option<PlaybackStatus> {
        let previous = self.session.status;
        if previous == status {
            return None;
        }
        self.session.status = status;
        Some(previous)
    }

    /// Empty the queue, reset the session to idle and hide the player.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.session = PlaybackSession::default();
        self.visible = false;
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            queue: self.queue.tracks().to_vec(),
            queue_name: self.queue.name().map(str::to_string),
            current_index: self.queue.current_index(),
            current_track: self.queue.current().cloned(),
            status: self.session.status,
            current_time: self.session.current_time,
            duration: self.session.duration,
            is_player_visible: self.visible,
        }
    }
}

/// Point-in-time copy of the player, suitable for rendering or serializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub queue: Vec<Track>,
    pub queue_name: Option<String>,
    /// Zero when the queue is empty.
    pub current_index: usize,
    pub current_track: Option<Track>,
    pub status: PlaybackStatus,
    pub current_time: f64,
    pub duration: f64,
    pub is_player_visible: bool,
}

impl PlayerSnapshot {
    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_states_map_to_status() {
        let cases = [
            (0, Some(PlaybackStatus::Idle)),
            (1, Some(PlaybackStatus::Loading)),
            (2, Some(PlaybackStatus::Playing)),
            (3, Some(PlaybackStatus::Paused)),
            (4, Some(PlaybackStatus::Idle)),
            (5, Some(PlaybackStatus::Ended)),
            (6, Some(PlaybackStatus::Loading)),
            (7, Some(PlaybackStatus::Stalled)),
            (8, Some(PlaybackStatus::Stalled)),
            (9, Some(PlaybackStatus::Ended)),
            (17, None),
        ];
        for (code, expected) in cases {
            assert_eq!(
                PlaybackStatus::from_engine(EngineState::from_code(code)),
                expected,
                "code {code}"
            );
        }
    }

    #[test]
    fn blank_identifiers_are_not_playable() {
        assert!(Track::new("123", "Song").is_playable());
        assert!(!Track::new("", "Song").is_playable());
        assert!(!Track::new("   ", "Song").is_playable());
    }

    #[test]
    fn track_accepts_catalog_row_names() {
        let json = r#"{
            "track_id": "1527323477",
            "track_name": "Midnight City",
            "artist": "M83",
            "album_name": "Hurry Up, We're Dreaming",
            "image_url": "https://example.invalid/art.jpg",
            "duration_ms": 243000
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.title, "Midnight City");
        assert_eq!(track.album.as_deref(), Some("Hurry Up, We're Dreaming"));
        assert_eq!(track.duration(), Some(Duration::from_secs(243)));
    }

    #[test]
    fn set_status_reports_transitions_only() {
        let mut state = PlayerState::default();
        assert_eq!(state.set_status(PlaybackStatus::Loading), Some(PlaybackStatus::Idle));
        assert_eq!(state.set_status(PlaybackStatus::Loading), None);
    }

    #[test]
    fn reset_hides_player() {
        let mut state = PlayerState {
            queue: Queue::new(vec![Track::new("a", "A")], Some("Mix".into()), 0),
            session: PlaybackSession {
                status: PlaybackStatus::Playing,
                current_time: 12.0,
                duration: 200.0,
            },
            visible: true,
        };
        state.reset();
        let snapshot = state.snapshot();
        assert!(snapshot.queue.is_empty());
        assert_eq!(snapshot.queue_name, None);
        assert_eq!(snapshot.current_track, None);
        assert_eq!(snapshot.status, PlaybackStatus::Idle);
        assert_eq!(snapshot.current_time, 0.0);
        assert!(!snapshot.is_player_visible);
    }
}
