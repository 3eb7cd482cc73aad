//! # Playback Error Types
//!
//! Error types for queue submission, transport commands and favorite updates.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The engine rejected a command for a reason other than unresolvable content.
    #[error("Engine error: {0}")]
    Engine(#[from] BridgeError),

    // ========================================================================
    // Queue Resolution Errors
    // ========================================================================
    /// Every track of the submitted queue was rejected as unresolvable.
    /// The queue has been cleared and the player hidden.
    #[error("No playable tracks remain in the queue")]
    NoPlayableTracks,

    /// The engine kept rejecting tracks after the maximum number of attempts.
    #[error("Queue still unresolvable after {attempts} attempts")]
    ResolutionExhausted { attempts: u32 },

    // ========================================================================
    // Favorite Errors
    // ========================================================================
    /// The rating service reported failure; membership is unchanged.
    #[error("Rating change refused for track {track_id}")]
    RatingRejected { track_id: String },

    /// A rating call for the same track is still in flight.
    #[error("Rating change already in progress for track {track_id}")]
    RatingInFlight { track_id: String },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid controller configuration: {0}")]
    InvalidConfig(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::RatingInFlight { .. }
                | PlaybackError::Engine(BridgeError::Io(_))
                | PlaybackError::Engine(BridgeError::NotAvailable(_))
        )
    }

    /// Returns `true` if the queue could not be loaded because of unresolvable content.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            PlaybackError::NoPlayableTracks | PlaybackError::ResolutionExhausted { .. }
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
