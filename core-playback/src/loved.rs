//! # Loved Set
//!
//! Favorite membership plus the identifiers with a rating call in flight.

use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Debug, Default, Clone)]
pub struct LovedSet {
    loved: HashSet<String>,
    pending: HashSet<String>,
}

impl LovedSet {
    pub fn contains(&self, track_id: &str) -> bool {
        self.loved.contains(track_id)
    }

    pub fn is_pending(&self, track_id: &str) -> bool {
        self.pending.contains(track_id)
    }

    pub fn set_loved(&mut self, track_id: &str, loved: bool) {
        if loved {
            self.loved.insert(track_id.to_string());
        } else {
            self.loved.remove(track_id);
        }
    }

    /// Replace membership wholesale. Pending marks are left alone.
    pub fn replace<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loved = ids.into_iter().map(Into::into).collect();
    }

    /// Loved identifiers in sorted order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.loved.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.loved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loved.is_empty()
    }
}

/// Pending mark for one track, cleared on drop.
#[derive(Debug)]
pub(crate) struct PendingLove<'a> {
    set: &'a Mutex<LovedSet>,
    track_id: String,
    /// Membership when the mark was taken.
    pub was_loved: bool,
}

impl<'a> PendingLove<'a> {
    /// Mark `track_id` pending. `None` when a call for it is already in flight.
    pub fn begin(set: &'a Mutex<LovedSet>, track_id: &str) -> Option<Self> {
        let mut guard = set.lock();
        if !guard.pending.insert(track_id.to_string()) {
            return None;
        }
        let was_loved = guard.contains(track_id);
        Some(Self {
            set,
            track_id: track_id.to_string(),
            was_loved,
        })
    }

    /// Record the confirmed flip. The pending mark is still cleared on drop.
    pub fn commit(&self) -> bool {
        let loved = !self.was_loved;
        self.set.lock().set_loved(&self.track_id, loved);
        loved
    }
}

impl Drop for PendingLove<'_> {
    fn drop(&mut self) {
        self.set.lock().pending.remove(&self.track_id);
    }
}
