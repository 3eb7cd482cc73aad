//! Media engine bridge: the command/event contract of an authorized session.
//!
//! The playback core never renders audio itself. It drives an external engine
//! (a web player, a native media framework, a remote device) through the
//! [`MediaEngine`] trait and listens to the engine's push notifications as a
//! stream of [`EngineEvent`]s. Host applications hand the core an
//! `Arc<dyn MediaEngine>` once their own authorization flow has produced a
//! session; until then the core treats the handle as absent.
//!
//! Engines report their playback state as a small integer. That integer is
//! converted into [`EngineState`] here, at the boundary, so nothing past this
//! module ever branches on a raw code.

use crate::error::Result;
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};

/// Receiving half of an engine event subscription.
pub type EngineEventReceiver = broadcast::Receiver<EngineEvent>;

/// Playback state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    None,
    Loading,
    Playing,
    Paused,
    Stopped,
    Ended,
    Seeking,
    Waiting,
    Stalled,
    Completed,
    /// A code outside the documented enumeration.
    Unknown(i32),
}

impl EngineState {
    /// Map the engine's numeric state code.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => EngineState::None,
            1 => EngineState::Loading,
            2 => EngineState::Playing,
            3 => EngineState::Paused,
            4 => EngineState::Stopped,
            5 => EngineState::Ended,
            6 => EngineState::Seeking,
            7 => EngineState::Waiting,
            8 => EngineState::Stalled,
            9 => EngineState::Completed,
            other => EngineState::Unknown(other),
        }
    }

    /// Numeric code understood by the engine.
    pub fn code(&self) -> i32 {
        match self {
            EngineState::None => 0,
            EngineState::Loading => 1,
            EngineState::Playing => 2,
            EngineState::Paused => 3,
            EngineState::Stopped => 4,
            EngineState::Ended => 5,
            EngineState::Seeking => 6,
            EngineState::Waiting => 7,
            EngineState::Stalled => 8,
            EngineState::Completed => 9,
            EngineState::Unknown(code) => *code,
        }
    }

    /// `true` for the buffering/interrupted states a stall watchdog cares about.
    pub fn is_waiting(&self) -> bool {
        matches!(self, EngineState::Waiting | EngineState::Stalled)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, EngineState::Playing)
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineState::None => "none",
            EngineState::Loading => "loading",
            EngineState::Playing => "playing",
            EngineState::Paused => "paused",
            EngineState::Stopped => "stopped",
            EngineState::Ended => "ended",
            EngineState::Seeking => "seeking",
            EngineState::Waiting => "waiting",
            EngineState::Stalled => "stalled",
            EngineState::Completed => "completed",
            EngineState::Unknown(_) => "unknown",
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Unknown(code) => write!(f, "unknown({code})"),
            other => write!(f, "{} ({})", other.name(), other.code()),
        }
    }
}

/// Push notification emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    /// The engine's playback state changed; `state` is the raw code.
    PlaybackStateDidChange { state: i32 },
    /// The engine moved to another item. Carries no payload: consumers
    /// re-read [`MediaEngine::now_playing_item_id`].
    NowPlayingItemDidChange,
    /// Playback position in seconds.
    PlaybackTimeDidChange { current_time: f64 },
    /// Duration of the current item in seconds.
    PlaybackDurationDidChange { duration: f64 },
}

impl EngineEvent {
    pub fn state_changed(state: EngineState) -> Self {
        EngineEvent::PlaybackStateDidChange {
            state: state.code(),
        }
    }

    /// Decoded state for `PlaybackStateDidChange`, `None` for other events.
    pub fn engine_state(&self) -> Option<EngineState> {
        match self {
            EngineEvent::PlaybackStateDidChange { state } => Some(EngineState::from_code(*state)),
            _ => None,
        }
    }
}

/// Queue submission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRequest {
    /// Engine-resolvable track identifiers, in playback order.
    pub ids: Vec<String>,
    /// Index of the item to start with. `None` means the first one.
    pub start_with: Option<usize>,
    /// Start playing as soon as the queue is loaded.
    pub start_playing: bool,
}

impl QueueRequest {
    pub fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            start_with: None,
            start_playing: true,
        }
    }

    pub fn start_with(mut self, index: usize) -> Self {
        self.start_with = Some(index);
        self
    }

    pub fn start_playing(mut self, start_playing: bool) -> Self {
        self.start_playing = start_playing;
        self
    }
}

/// Authorized connection to an external playback engine.
///
/// Command methods are asynchronous and may reject. Callers must not issue
/// two transport or queue commands concurrently against the same handle; the
/// playback core serializes them. `rate`/`unrate` may run alongside them.
///
/// The property accessors (`is_authorized`, `is_playing`,
/// `now_playing_item_id`) read the engine's current view synchronously and
/// must not block.
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync {
    /// Whether the user granted the session access to personal APIs (ratings).
    fn is_authorized(&self) -> bool;

    /// Whether the engine currently reports active playback.
    fn is_playing(&self) -> bool;

    /// Engine identifier of the item it considers "now playing".
    fn now_playing_item_id(&self) -> Option<String>;

    /// Open a new subscription to the engine's event stream.
    fn subscribe_events(&self) -> EngineEventReceiver;

    /// Halt playback and clear the engine's queue.
    async fn stop(&self) -> Result<()>;

    /// Load a queue. May reject with a resolution error naming the
    /// identifiers the engine could not map to playable content.
    async fn set_queue(&self, request: QueueRequest) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn skip_to_next(&self) -> Result<()>;

    async fn skip_to_previous(&self) -> Result<()>;

    /// Seek to an absolute position, in seconds.
    async fn seek_to_time(&self, time: f64) -> Result<()>;

    /// Mark a track as favorite. `Ok(false)` means the service refused.
    async fn rate(&self, track_id: &str) -> Result<bool>;

    /// Clear a track's favorite flag. `Ok(false)` means the service refused.
    async fn unrate(&self, track_id: &str) -> Result<bool>;
}
