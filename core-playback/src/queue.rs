//! # Queue Model
//!
//! The controller's own ordered view of what should be playing.
//!
//! A queue is replaced wholesale on every playback request. After that it is
//! only mutated by pruning (unresolvable tracks) and by moving the current
//! position. The current index always points into the queue when it is
//! non-empty and is zero when it is empty.

use crate::model::Track;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    tracks: Vec<Track>,
    name: Option<String>,
    current_index: usize,
}

impl Queue {
    /// Create a queue positioned at `start_index`, clamped into range.
    pub fn new(tracks: Vec<Track>, name: Option<String>, start_index: usize) -> Self {
        let current_index = clamp_index(start_index, tracks.len());
        Self {
            tracks,
            name,
            current_index,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    pub fn is_at_first(&self) -> bool {
        self.current_index == 0
    }

    /// `true` at the last entry, and for an empty queue.
    pub fn is_at_last(&self) -> bool {
        self.current_index + 1 >= self.tracks.len()
    }

    /// Engine identifiers in playback order.
    pub fn ids(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.track_id.clone()).collect()
    }

    /// Index of the first entry with `track_id`.
    pub fn position_of(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.track_id == track_id)
    }

    /// Move to `index`. Out-of-range indices are ignored.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index >= self.tracks.len() {
            return false;
        }
        self.current_index = index;
        true
    }

    /// Swap in a pruned track list, keeping the name.
    pub fn replace_tracks(&mut self, tracks: Vec<Track>, current_index: usize) {
        self.current_index = clamp_index(current_index, tracks.len());
        self.tracks = tracks;
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.name = None;
        self.current_index = 0;
    }
}

fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}
