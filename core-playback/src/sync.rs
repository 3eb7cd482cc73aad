//! # Event Synchronizer
//!
//! Folds the engine's event stream into the controller state.
//!
//! The engine owns the true playback position, so the controller never
//! predicts it: every state, item and timing notification overwrites what the
//! controller believed. Item changes are matched by identifier against the
//! current queue content, which keeps them correct while the resolution loop
//! is still pruning.

use bridge_traits::{EngineEvent, EngineEventReceiver, EngineState};
use core_async::sync::broadcast::error::RecvError;
use core_async::task::{self, JoinHandle};
use core_async::time::duration_from_secs_f64;
use tracing::{debug, trace, warn};

use crate::model::{PlaybackStatus, PlayerState};

/// What the watchdog should do after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    Arm,
    Cancel,
}

/// Effect of one `PlaybackStateDidChange` on the controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// `(from, to)` when the session status changed.
    pub transition: Option<(PlaybackStatus, PlaybackStatus)>,
    pub watchdog: WatchdogAction,
}

/// Apply an engine state to the session.
///
/// Unknown codes leave the status untouched but still count as "not
/// stalled" for the watchdog.
pub(crate) fn apply_state(state: &mut PlayerState, engine_state: EngineState) -> StateChange {
    let watchdog = if engine_state.is_waiting() {
        WatchdogAction::Arm
    } else {
        WatchdogAction::Cancel
    };

    let transition = match PlaybackStatus::from_engine(engine_state) {
        Some(status) => state.set_status(status).map(|from| (from, status)),
        None => {
            warn!(state = %engine_state, "Ignoring unknown engine state");
            None
        }
    };

    debug!(state = %engine_state, "playbackStateDidChange");
    StateChange {
        transition,
        watchdog,
    }
}

/// Re-align the current index with the engine's now-playing item.
///
/// Returns the new index when the item was found in the queue. Unknown or
/// missing items change nothing.
pub(crate) fn apply_now_playing(state: &mut PlayerState, item_id: Option<&str>) -> Option<usize> {
    let item_id = item_id?;
    let index = state.queue.position_of(item_id)?;
    state.queue.set_current(index);
    state.session.reset_timing();
    debug!(index, track_id = item_id, "nowPlayingItemDidChange");
    Some(index)
}

/// Negative or non-finite times (engines report NaN before media loads)
/// are stored as zero.
pub(crate) fn apply_time(state: &mut PlayerState, current_time: f64) {
    state.session.current_time = seconds(current_time);
}

/// A duration of zero means "unknown".
pub(crate) fn apply_duration(state: &mut PlayerState, duration: f64) {
    state.session.duration = seconds(duration);
}

fn seconds(value: f64) -> f64 {
    duration_from_secs_f64(value).as_secs_f64()
}

/// Owned handle of the task draining one engine subscription.
///
/// Dropping it stops the task.
#[derive(Debug)]
pub(crate) struct EventSubscription {
    handle: JoinHandle<()>,
}

impl EventSubscription {
    /// Drain `receiver` on a background task, calling `handler` per event.
    ///
    /// The task ends when the handler returns `false`, the engine closes its
    /// stream, or the subscription is dropped. Lagged events are skipped:
    /// every event type carries absolute values, so the next one repairs the
    /// state.
    pub fn spawn<F>(mut receiver: EngineEventReceiver, mut handler: F) -> Self
    where
        F: FnMut(EngineEvent) -> bool + Send + 'static,
    {
        let handle = task::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        trace!(?event, "Engine event");
                        if !handler(event) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Engine event subscription lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Engine event stream closed");
                        break;
                    }
                }
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Track;
    use crate::queue::Queue;
    use core_async::sync::broadcast;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn state_with(ids: &[&str]) -> PlayerState {
        PlayerState {
            queue: Queue::new(ids.iter().map(|id| Track::new(*id, "")).collect(), None, 0),
            ..Default::default()
        }
    }

    #[test]
    fn waiting_and_stalled_arm_watchdog() {
        let mut state = state_with(&["a"]);
        let change = apply_state(&mut state, EngineState::Waiting);
        assert_eq!(change.watchdog, WatchdogAction::Arm);
        assert_eq!(
            change.transition,
            Some((PlaybackStatus::Idle, PlaybackStatus::Stalled))
        );

        let change = apply_state(&mut state, EngineState::Stalled);
        assert_eq!(change.watchdog, WatchdogAction::Arm);
        assert_eq!(change.transition, None);
    }

    #[test]
    fn other_states_cancel_watchdog() {
        let mut state = state_with(&["a"]);
        for code in [0, 1, 2, 3, 4, 5, 6, 9, 42] {
            let change = apply_state(&mut state, EngineState::from_code(code));
            assert_eq!(change.watchdog, WatchdogAction::Cancel, "code {code}");
        }
    }

    #[test]
    fn unknown_state_keeps_status() {
        let mut state = state_with(&["a"]);
        apply_state(&mut state, EngineState::Playing);
        let change = apply_state(&mut state, EngineState::Unknown(99));
        assert_eq!(change.transition, None);
        assert_eq!(state.session.status, PlaybackStatus::Playing);
    }

    #[test]
    fn now_playing_moves_index_and_resets_timing() {
        let mut state = state_with(&["a", "b", "c"]);
        apply_time(&mut state, 31.5);
        apply_duration(&mut state, 200.0);

        assert_eq!(apply_now_playing(&mut state, Some("c")), Some(2));
        assert_eq!(state.queue.current_index(), 2);
        assert_eq!(state.session.current_time, 0.0);
        assert_eq!(state.session.duration, 0.0);

        // Same item again: index stays put.
        assert_eq!(apply_now_playing(&mut state, Some("c")), Some(2));
        assert_eq!(state.queue.current_index(), 2);
    }

    #[test]
    fn non_finite_timing_is_stored_as_zero() {
        let mut state = state_with(&["a"]);
        apply_duration(&mut state, f64::NAN);
        apply_time(&mut state, f64::INFINITY);
        assert_eq!(state.session.duration, 0.0);
        assert_eq!(state.session.current_time, 0.0);

        apply_duration(&mut state, -1.0);
        assert_eq!(state.session.duration, 0.0);

        apply_duration(&mut state, 215.25);
        assert_eq!(state.session.duration, 215.25);
    }

    #[test]
    fn unknown_item_changes_nothing() {
        let mut state = state_with(&["a", "b"]);
        state.queue.set_current(1);
        apply_time(&mut state, 12.0);

        assert_eq!(apply_now_playing(&mut state, Some("zzz")), None);
        assert_eq!(apply_now_playing(&mut state, None), None);
        assert_eq!(state.queue.current_index(), 1);
        assert_eq!(state.session.current_time, 12.0);
    }

    #[tokio::test]
    async fn subscription_forwards_until_closed() {
        let (tx, rx) = broadcast::channel(8);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let subscription = EventSubscription::spawn(rx, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tx.send(EngineEvent::NowPlayingItemDidChange).unwrap();
        tx.send(EngineEvent::PlaybackTimeDidChange { current_time: 1.0 })
            .unwrap();
        drop(tx);

        for _ in 0..100 {
            if subscription.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(subscription.is_finished());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn handler_can_stop_subscription() {
        let (tx, rx) = broadcast::channel(8);
        let subscription = EventSubscription::spawn(rx, |_| false);

        tx.send(EngineEvent::NowPlayingItemDidChange).unwrap();
        for _ in 0..100 {
            if subscription.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(subscription.is_finished());
    }
}
