//! # Controller Configuration
//!
//! Tunables of the queue controller: the resolution retry bound, the stall
//! watchdog timeout, autoplay on submission and the event bus buffer.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queue controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Maximum number of `set_queue` attempts per submission, counting the first.
    ///
    /// Each rejected attempt prunes the identifiers the engine could not resolve.
    ///
    /// Default: 5.
    #[serde(default = "default_max_resolution_attempts")]
    pub max_resolution_attempts: u32,

    /// How long playback may stay waiting/stalled before the watchdog issues
    /// a stop/play recovery.
    ///
    /// Default: 4 seconds.
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout: Duration,

    /// Whether submitted queues start playing as soon as the engine accepts them.
    ///
    /// Default: true.
    #[serde(default = "default_start_playing")]
    pub start_playing: bool,

    /// Buffer of the event bus created by [`QueueController::new`](crate::QueueController::new).
    ///
    /// Default: 100 events.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_resolution_attempts: default_max_resolution_attempts(),
            stall_timeout: default_stall_timeout(),
            start_playing: default_start_playing(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl ControllerConfig {
    pub fn with_max_resolution_attempts(mut self, attempts: u32) -> Self {
        self.max_resolution_attempts = attempts;
        self
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    pub fn with_start_playing(mut self, start_playing: bool) -> Self {
        self.start_playing = start_playing;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.max_resolution_attempts == 0 {
            return Err(PlaybackError::InvalidConfig(
                "max_resolution_attempts must be > 0".to_string(),
            ));
        }

        if self.stall_timeout.is_zero() {
            return Err(PlaybackError::InvalidConfig(
                "stall_timeout must be > 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(PlaybackError::InvalidConfig(
                "event_buffer_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_max_resolution_attempts() -> u32 {
    5
}

fn default_stall_timeout() -> Duration {
    Duration::from_millis(4000)
}

fn default_start_playing() -> bool {
    true
}

fn default_event_buffer_size() -> usize {
    core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE
}
