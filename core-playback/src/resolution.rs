//! # Resolution Retry Loop
//!
//! Hands a queue to the engine and recovers from partially unresolvable
//! content.
//!
//! Engines reject a whole `set_queue` call when any identifier cannot be
//! mapped to playable content, naming the offenders in the error text:
//!
//! ```text
//! NOT_FOUND: One or more items could not be resolved: 1527323477, 1440857781
//! ```
//!
//! The loop parses those identifiers, drops them from the candidate list and
//! resubmits, up to a bounded number of attempts. Any rejection that does not
//! carry the marker is treated as unrelated and ends the loop immediately.

use bridge_traits::{BridgeError, MediaEngine, QueueRequest};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::model::Track;

/// Phrase preceding the rejected identifiers, matched case-insensitively.
pub const RESOLUTION_MARKER: &str = "could not be resolved:";

/// Extract the identifiers an engine reported as unresolvable.
///
/// Everything after the marker up to the end of its line is split on commas
/// and whitespace. Duplicates are dropped, first occurrence wins. An empty
/// result means the message is not a resolution error.
pub fn parse_rejected_ids(message: &str) -> Vec<String> {
    // ASCII lowering keeps byte offsets aligned with `message`.
    let lowered = message.to_ascii_lowercase();
    let Some(marker_at) = lowered.find(RESOLUTION_MARKER) else {
        return Vec::new();
    };

    let remainder = &message[marker_at + RESOLUTION_MARKER.len()..];
    let line = remainder.lines().next().unwrap_or_default();

    let mut seen = HashSet::new();
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// The list being offered to the engine and the entry playback should start at.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueCandidate {
    tracks: Vec<Track>,
    start_index: usize,
}

impl QueueCandidate {
    pub fn new(tracks: Vec<Track>, start_index: usize) -> Self {
        let start_index = start_index.min(tracks.len().saturating_sub(1));
        Self {
            tracks,
            start_index,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn request(&self, start_playing: bool) -> QueueRequest {
        QueueRequest {
            ids: self.tracks.iter().map(|t| t.track_id.clone()).collect(),
            start_with: Some(self.start_index),
            start_playing,
        }
    }

    /// Drop every track whose identifier was rejected and reposition the start.
    ///
    /// If the start track itself was rejected the start index is clamped to
    /// the new length; otherwise it follows the same track into the pruned
    /// list. Returns the number of tracks removed.
    pub fn prune(&mut self, rejected: &[String]) -> usize {
        let rejected: HashSet<&str> = rejected.iter().map(String::as_str).collect();
        let start_rejected = self
            .tracks
            .get(self.start_index)
            .map_or(true, |t| rejected.contains(t.track_id.as_str()));

        let before = self.tracks.len();
        let mut kept_before_start = 0;
        let mut kept = Vec::with_capacity(before);
        for (index, track) in self.tracks.drain(..).enumerate() {
            if rejected.contains(track.track_id.as_str()) {
                continue;
            }
            if index < self.start_index {
                kept_before_start += 1;
            }
            kept.push(track);
        }
        self.tracks = kept;

        let last = self.tracks.len().saturating_sub(1);
        self.start_index = if start_rejected {
            self.start_index.min(last)
        } else {
            kept_before_start
        };

        before - self.tracks.len()
    }
}

/// How a resolution run ended.
#[derive(Debug)]
pub enum ResolutionOutcome {
    /// The engine accepted the (possibly pruned) queue.
    Accepted { attempts: u32 },
    /// A rejection without resolution details, or naming only identifiers
    /// absent from the queue. No retry was made.
    Unrelated { attempts: u32, error: BridgeError },
    /// Every track was pruned.
    AllRejected { attempts: u32 },
    /// The engine still rejected the queue on the final attempt.
    Exhausted { attempts: u32 },
}

impl ResolutionOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            ResolutionOutcome::Accepted { attempts }
            | ResolutionOutcome::Unrelated { attempts, .. }
            | ResolutionOutcome::AllRejected { attempts }
            | ResolutionOutcome::Exhausted { attempts } => *attempts,
        }
    }
}

/// Submit `candidate` until the engine accepts it or the loop gives up.
///
/// `on_pruned` runs after every successful prune with the pruned candidate,
/// the 1-based attempt that was rejected and the rejected identifiers, so the
/// caller can publish the cleaned queue before the next attempt.
pub async fn resolve<F>(
    engine: &dyn MediaEngine,
    candidate: &mut QueueCandidate,
    max_attempts: u32,
    start_playing: bool,
    mut on_pruned: F,
) -> ResolutionOutcome
where
    F: FnMut(&QueueCandidate, u32, &[String]),
{
    for attempt in 1..=max_attempts {
        debug!(
            attempt,
            track_count = candidate.tracks.len(),
            start_index = candidate.start_index,
            "Submitting queue to engine"
        );

        let error = match engine.set_queue(candidate.request(start_playing)).await {
            Ok(()) => {
                info!(attempt, track_count = candidate.tracks.len(), "Engine accepted queue");
                return ResolutionOutcome::Accepted { attempts: attempt };
            }
            Err(error) => error,
        };

        let rejected = parse_rejected_ids(&error.message());
        if rejected.is_empty() {
            error!(attempt, error = %error, "Queue rejected (non-recoverable)");
            return ResolutionOutcome::Unrelated {
                attempts: attempt,
                error,
            };
        }

        let removed = candidate.prune(&rejected);
        if removed == 0 {
            // Resubmitting an identical request cannot succeed.
            error!(
                attempt,
                rejected = %rejected.join(", "),
                "Rejected identifiers are not in the queue"
            );
            return ResolutionOutcome::Unrelated {
                attempts: attempt,
                error,
            };
        }
        warn!(
            attempt,
            rejected = %rejected.join(", "),
            removed,
            "Removing unresolvable tracks"
        );

        if candidate.is_empty() {
            error!(attempt, "No playable tracks remain");
            return ResolutionOutcome::AllRejected { attempts: attempt };
        }

        on_pruned(candidate, attempt, &rejected);
    }

    error!(attempts = max_attempts, "Queue failed after max retries");
    ResolutionOutcome::Exhausted {
        attempts: max_attempts,
    }
}
