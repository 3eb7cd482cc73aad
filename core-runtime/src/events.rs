//! # Event Bus System
//!
//! Provides an event-driven architecture for the playback core using `tokio::sync::broadcast`.
//! Hosts observe the controller through typed events instead of polling its state.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for queue, playback and favorite changes
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  emit   ┌───────────┐
//! │ Queue Controller ├────────>│           │   subscribe   ┌────────────┐
//! └──────────────────┘         │ EventBus  ├──────────────>│ UI / host  │
//! ┌──────────────────┐  emit   │ (broadcast│               └────────────┘
//! │ Event Sync       ├────────>│  channel) │   subscribe   ┌────────────┐
//! └──────────────────┘         │           ├──────────────>│ Telemetry  │
//! ┌──────────────────┐  emit   │           │               └────────────┘
//! │ Stall Watchdog   ├────────>│           │
//! └──────────────────┘         └───────────┘
//! ```
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, QueueEvent};
//!
//! let event_bus = EventBus::new(100);
//! let event = CoreEvent::Queue(QueueEvent::Cleared {
//!     reason: "closed".to_string(),
//! });
//!
//! // Errors only when nobody is subscribed.
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, RecvError};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(RecvError::Lagged(n)) => eprintln!("Missed {} events", n),
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber was too slow and missed `n` events.
//!   Non-fatal; keep receiving.
//! - **`RecvError::Closed`**: every sender was dropped. Treat it as shutdown.
//!
//! Playback timing updates (`current_time`, `duration`) are deliberately not
//! published here: they arrive several times a second and are read from the
//! controller snapshot instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use core_async::sync::broadcast;

// Re-export commonly used types
pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Queue submission and resolution events
    Queue(QueueEvent),
    /// Engine-driven playback state events
    Playback(PlaybackEvent),
    /// Favorite (love) membership events
    Favorite(FavoriteEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Favorite(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Queue(QueueEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Favorite(FavoriteEvent::LoveFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::StallDetected { .. }) => EventSeverity::Warning,
            CoreEvent::Queue(QueueEvent::ResolutionRetry { .. }) => EventSeverity::Warning,
            CoreEvent::Queue(QueueEvent::Accepted { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::StallRecovery { .. }) => EventSeverity::Info,
            CoreEvent::Favorite(FavoriteEvent::LoveToggled { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Queue Events
// ============================================================================

/// Events emitted while a queue is handed to the engine.
///
/// Every event of one submission shares the same `submission_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// A new queue replaced the previous one and is being loaded.
    Submitted {
        submission_id: String,
        track_count: usize,
        start_index: usize,
        name: Option<String>,
    },
    /// The engine rejected some identifiers; the pruned queue is being resubmitted.
    ResolutionRetry {
        submission_id: String,
        /// 1-based number of the attempt that was rejected.
        attempt: u32,
        rejected: Vec<String>,
        /// Tracks left after pruning.
        remaining: usize,
    },
    /// The engine accepted the queue.
    Accepted {
        submission_id: String,
        track_count: usize,
        start_index: usize,
        attempts: u32,
    },
    /// The queue could not be loaded.
    Failed {
        submission_id: String,
        message: String,
        attempts: u32,
        /// `true` when the failure also cleared the queue and hid the player.
        cleared: bool,
    },
    /// The queue was emptied and the player hidden.
    Cleared { reason: String },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::Submitted { .. } => "Queue submitted",
            QueueEvent::ResolutionRetry { .. } => "Retrying queue without unresolvable tracks",
            QueueEvent::Accepted { .. } => "Queue accepted by engine",
            QueueEvent::Failed { .. } => "Queue failed to load",
            QueueEvent::Cleared { .. } => "Queue cleared",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events derived from the engine's event stream and the stall watchdog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Session status moved between two states (e.g. "loading" -> "playing").
    StatusChanged { from: String, to: String },
    /// The engine moved to another queue entry.
    NowPlayingChanged { track_id: String, index: usize },
    /// Playback entered a waiting/stalled state; recovery is scheduled.
    StallDetected { timeout_ms: u64 },
    /// The watchdog fired and issued a stop/play recovery.
    StallRecovery {
        track_id: Option<String>,
        succeeded: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StatusChanged { .. } => "Playback status changed",
            PlaybackEvent::NowPlayingChanged { .. } => "Now playing changed",
            PlaybackEvent::StallDetected { .. } => "Playback stalled",
            PlaybackEvent::StallRecovery { .. } => "Stall recovery issued",
        }
    }
}

// ============================================================================
// Favorite Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FavoriteEvent {
    /// The engine confirmed a rating change.
    LoveToggled { track_id: String, loved: bool },
    /// The rating call failed or was refused; membership is unchanged.
    LoveFailed { track_id: String, message: String },
}

impl FavoriteEvent {
    fn description(&self) -> &str {
        match self {
            FavoriteEvent::LoveToggled { .. } => "Favorite updated",
            FavoriteEvent::LoveFailed { .. } => "Favorite update failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (a `tokio::sync::broadcast` requirement).
    /// Configuration validation rejects a zero buffer before it gets here.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Returns the number of subscribers that received it, or an error when
    /// there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribes with a filterable [`EventStream`] wrapper.
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver wrapper that skips events rejected by an optional predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Waits for the next event passing the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every event currently queued that passes the filter.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
