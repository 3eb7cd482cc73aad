//! # Queue Controller
//!
//! Public façade owning "what is playing".
//!
//! The controller keeps its own queue model and drives an external engine
//! through the [`MediaEngine`] contract. Three things can disturb the two
//! views of playback and are handled here:
//!
//! - partial rejection of a queue (resolution retry loop, see [`crate::resolution`]),
//! - an event stream that may duplicate or reorder notifications (see [`crate::sync`]),
//! - the engine silently stalling (see [`crate::watchdog`]).
//!
//! ## Locking
//!
//! Model state sits behind a synchronous lock that is never held across an
//! `.await`. Engine commands are serialized by one async command lock, so a
//! submission, a stall recovery and a close never interleave their commands.
//! Rating calls do not take the command lock.
//!
//! ## No session
//!
//! Every command is a silent no-op until a session is attached.

use bridge_traits::{EngineEvent, EngineState, MediaEngine};
use core_async::runtime;
use core_async::sync::Mutex as CommandLock;
use core_runtime::config::CoreConfig;
use core_runtime::events::{
    CoreEvent, EventBus, EventStream, FavoriteEvent, PlaybackEvent, QueueEvent,
};
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ControllerConfig;
use crate::error::{PlaybackError, Result};
use crate::loved::{LovedSet, PendingLove};
use crate::model::{PlaybackStatus, PlayerSnapshot, PlayerState, Track};
use crate::queue::Queue;
use crate::resolution::{self, QueueCandidate, ResolutionOutcome};
use crate::sync::{self, EventSubscription, WatchdogAction};
use crate::watchdog::StallWatchdog;

/// Coordinates one in-memory playback session against an external engine.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct QueueController {
    inner: Arc<Inner>,
}

struct Inner {
    config: ControllerConfig,
    engine: RwLock<Option<Arc<dyn MediaEngine>>>,
    state: Mutex<PlayerState>,
    loved: Mutex<LovedSet>,
    commands: CommandLock<()>,
    watchdog: StallWatchdog,
    subscription: Mutex<Option<EventSubscription>>,
    events: EventBus,
}

impl QueueController {
    /// Create a controller with its own event bus.
    pub fn new(config: ControllerConfig) -> Result<Self> {
        let events = EventBus::new(config.event_buffer_size.max(1));
        Self::with_event_bus(config, events)
    }

    /// Create a controller publishing on a shared event bus.
    pub fn with_event_bus(config: ControllerConfig, events: EventBus) -> Result<Self> {
        config.validate()?;
        let watchdog = StallWatchdog::new(config.stall_timeout);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                engine: RwLock::new(None),
                state: Mutex::new(PlayerState::default()),
                loved: Mutex::new(LovedSet::default()),
                commands: CommandLock::new(()),
                watchdog,
                subscription: Mutex::new(None),
                events,
            }),
        })
    }

    /// Create a controller from the host's core configuration.
    ///
    /// Uses the configured event bus capacity and attaches the engine session
    /// when one is present. Events are not bound yet.
    pub fn from_core_config(core: &CoreConfig, config: ControllerConfig) -> Result<Self> {
        let controller = Self::with_event_bus(config, core.event_bus())?;
        if let Some(engine) = core.engine.clone() {
            controller.attach_session(engine);
        }
        Ok(controller)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Event bus carrying queue, playback and favorite events.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe_events(&self) -> EventStream {
        self.inner.events.stream()
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Attach an authorized engine session, replacing any previous one.
    ///
    /// A previous session is detached first (events unbound, watchdog
    /// cancelled). Call [`bind_events`](Self::bind_events) to start syncing.
    pub fn attach_session(&self, engine: Arc<dyn MediaEngine>) {
        self.detach_session();
        *self.inner.engine.write() = Some(engine);
        info!("Engine session attached");
    }

    /// Detach the current session, returning it.
    pub fn detach_session(&self) -> Option<Arc<dyn MediaEngine>> {
        self.unbind_events();
        let previous = self.inner.engine.write().take();
        if previous.is_some() {
            info!("Engine session detached");
        }
        previous
    }

    pub fn has_session(&self) -> bool {
        self.inner.engine.read().is_some()
    }

    /// Subscribe to the session's engine events.
    ///
    /// Any previous subscription is dropped first, so there is never more
    /// than one. Returns `false` when no session is attached or when called
    /// outside a runtime.
    pub fn bind_events(&self) -> bool {
        self.unbind_events();

        let Some(engine) = self.inner.session() else {
            debug!("bind_events without session");
            return false;
        };
        if !runtime::in_runtime() {
            warn!("bind_events called outside a runtime");
            return false;
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let subscription = EventSubscription::spawn(engine.subscribe_events(), move |event| {
            match weak.upgrade() {
                Some(inner) => {
                    inner.apply_engine_event(event);
                    true
                }
                None => false,
            }
        });

        *self.inner.subscription.lock() = Some(subscription);
        debug!("Engine events bound");
        true
    }

    /// Drop the engine subscription and cancel the stall watchdog. Idempotent.
    pub fn unbind_events(&self) {
        self.inner.watchdog.cancel();
        if self.inner.subscription.lock().take().is_some() {
            debug!("Engine events unbound");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.inner
            .subscription
            .lock()
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }

    /// Fold one engine event into the controller state.
    ///
    /// Bound subscriptions call this for every event; hosts that forward
    /// events themselves may call it directly.
    pub fn apply_engine_event(&self, event: EngineEvent) {
        self.inner.apply_engine_event(event);
    }

    // ========================================================================
    // Queue submission
    // ========================================================================

    /// Replace the queue with `tracks` and start playback at `start_index`.
    ///
    /// Tracks with a blank identifier are dropped first; if none remain the
    /// call is a no-op. `start_index` refers to the unfiltered list and is
    /// clamped into range; if it pointed at a dropped track playback starts at
    /// the first playable one.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Engine`] when the engine rejects the queue for a
    ///   reason other than unresolvable tracks (queue kept, status idle)
    /// - [`PlaybackError::NoPlayableTracks`] when every track was unresolvable
    ///   (queue cleared, player hidden)
    /// - [`PlaybackError::ResolutionExhausted`] when tracks were still being
    ///   rejected on the last attempt (queue kept, status idle)
    #[instrument(skip(self, tracks, name), fields(track_count = tracks.len()))]
    pub async fn submit_queue(
        &self,
        tracks: Vec<Track>,
        start_index: usize,
        name: Option<String>,
    ) -> Result<()> {
        let Some(engine) = self.inner.session() else {
            debug!("submit_queue without session");
            return Ok(());
        };

        let (valid, start) = playable_tracks(tracks, start_index);
        if valid.is_empty() {
            debug!("No tracks with an identifier; nothing to submit");
            return Ok(());
        }

        let _commands = self.inner.commands.lock().await;

        if let Err(error) = engine.stop().await {
            debug!(error = %error, "Stop before submit failed (ignored)");
        }

        let submission_id = Uuid::new_v4().to_string();
        let track_count = valid.len();

        let transition = {
            let mut state = self.inner.state.lock();
            state.queue = Queue::new(valid.clone(), name.clone(), start);
            state.session.reset_timing();
            state.visible = true;
            state.set_status(PlaybackStatus::Loading)
        };
        self.inner.emit_transition(transition, PlaybackStatus::Loading);
        self.inner.emit(CoreEvent::Queue(QueueEvent::Submitted {
            submission_id: submission_id.clone(),
            track_count,
            start_index: start,
            name,
        }));
        info!(track_count, start_index = start, "Queue submitted");

        let mut candidate = QueueCandidate::new(valid, start);
        let outcome = resolution::resolve(
            engine.as_ref(),
            &mut candidate,
            self.inner.config.max_resolution_attempts,
            self.inner.config.start_playing,
            |pruned, attempt, rejected| {
                self.inner.state.lock().queue.replace_tracks(
                    pruned.tracks().to_vec(),
                    pruned.start_index(),
                );
                self.inner.emit(CoreEvent::Queue(QueueEvent::ResolutionRetry {
                    submission_id: submission_id.clone(),
                    attempt,
                    rejected: rejected.to_vec(),
                    remaining: pruned.tracks().len(),
                }));
            },
        )
        .await;

        self.inner
            .finish_submission(&submission_id, &candidate, outcome)
    }

    /// Play `tracks` from the beginning.
    pub async fn play_tracks(&self, tracks: Vec<Track>, name: Option<String>) -> Result<()> {
        self.submit_queue(tracks, 0, name).await
    }

    /// Play `tracks` starting at `index` of the given list.
    pub async fn play_track_at_index(&self, tracks: Vec<Track>, index: usize) -> Result<()> {
        self.submit_queue(tracks, index, None).await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn play(&self) -> Result<()> {
        let Some(engine) = self.inner.session() else {
            return Ok(());
        };
        let _commands = self.inner.commands.lock().await;
        engine.play().await.map_err(|error| {
            warn!(error = %error, "Failed to play");
            PlaybackError::from(error)
        })
    }

    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        let Some(engine) = self.inner.session() else {
            return Ok(());
        };
        let _commands = self.inner.commands.lock().await;
        engine.pause().await.map_err(|error| {
            warn!(error = %error, "Failed to pause");
            PlaybackError::from(error)
        })
    }

    /// Pause while playing, otherwise play.
    pub async fn toggle_play_pause(&self) -> Result<()> {
        if self.status().is_playing() {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Skip forward. No-op at the last entry.
    #[instrument(skip(self))]
    pub async fn next(&self) -> Result<()> {
        let Some(engine) = self.inner.session() else {
            return Ok(());
        };
        let index = {
            let state = self.inner.state.lock();
            if state.queue.is_at_last() {
                return Ok(());
            }
            state.queue.current_index()
        };
        debug!(index, "next()");
        let _commands = self.inner.commands.lock().await;
        engine.skip_to_next().await.map_err(|error| {
            warn!(error = %error, "skip_to_next failed");
            PlaybackError::from(error)
        })
    }

    /// Skip backward. No-op at the first entry.
    #[instrument(skip(self))]
    pub async fn previous(&self) -> Result<()> {
        let Some(engine) = self.inner.session() else {
            return Ok(());
        };
        let index = {
            let state = self.inner.state.lock();
            if state.queue.is_at_first() {
                return Ok(());
            }
            state.queue.current_index()
        };
        debug!(index, "previous()");
        let _commands = self.inner.commands.lock().await;
        engine.skip_to_previous().await.map_err(|error| {
            warn!(error = %error, "skip_to_previous failed");
            PlaybackError::from(error)
        })
    }

    /// Seek to `time` seconds. No-op while the duration is unknown.
    #[instrument(skip(self))]
    pub async fn seek(&self, time: f64) -> Result<()> {
        let Some(engine) = self.inner.session() else {
            return Ok(());
        };
        let duration = self.inner.state.lock().session.duration;
        if duration.is_nan() || duration <= 0.0 {
            debug!("Seek ignored without a known duration");
            return Ok(());
        }
        let _commands = self.inner.commands.lock().await;
        engine.seek_to_time(time).await.map_err(|error| {
            warn!(error = %error, "Failed to seek");
            PlaybackError::from(error)
        })
    }

    /// Stop playback, empty the queue and hide the player.
    ///
    /// The engine stop is best-effort; the local reset always happens.
    #[instrument(skip(self))]
    pub async fn close(&self) {
        info!("close()");
        self.inner.watchdog.cancel();

        let engine = self.inner.session();
        let _commands = self.inner.commands.lock().await;
        if let Some(engine) = engine {
            if let Err(error) = engine.stop().await {
                debug!(error = %error, "Stop on close failed (ignored)");
            }
        }

        let transition = {
            let mut state = self.inner.state.lock();
            let previous = state.session.status;
            state.reset();
            (previous != PlaybackStatus::Idle).then_some(previous)
        };
        self.inner.emit_transition(transition, PlaybackStatus::Idle);
        self.inner.emit(CoreEvent::Queue(QueueEvent::Cleared {
            reason: "closed".to_string(),
        }));
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    /// Flip the favorite flag of `track_id`.
    ///
    /// Returns `Ok(None)` without an authorized session, otherwise the new
    /// membership once the rating service confirmed the change.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::RatingInFlight`] while a call for the same track runs
    /// - [`PlaybackError::RatingRejected`] when the service refused
    /// - [`PlaybackError::Engine`] on transport failure
    ///
    /// Membership is unchanged on every error.
    #[instrument(skip(self))]
    pub async fn toggle_love(&self, track_id: &str) -> Result<Option<bool>> {
        let Some(engine) = self.inner.session() else {
            return Ok(None);
        };
        if !engine.is_authorized() {
            debug!("toggle_love without authorization");
            return Ok(None);
        }

        let Some(pending) = PendingLove::begin(&self.inner.loved, track_id) else {
            return Err(PlaybackError::RatingInFlight {
                track_id: track_id.to_string(),
            });
        };

        let result = if pending.was_loved {
            engine.unrate(track_id).await
        } else {
            engine.rate(track_id).await
        };

        let failure = match result {
            Ok(true) => {
                let loved = pending.commit();
                info!(loved, "Favorite updated");
                self.inner.emit(CoreEvent::Favorite(FavoriteEvent::LoveToggled {
                    track_id: track_id.to_string(),
                    loved,
                }));
                return Ok(Some(loved));
            }
            Ok(false) => PlaybackError::RatingRejected {
                track_id: track_id.to_string(),
            },
            Err(error) => PlaybackError::from(error),
        };

        warn!(error = %failure, "toggle_love failed");
        self.inner.emit(CoreEvent::Favorite(FavoriteEvent::LoveFailed {
            track_id: track_id.to_string(),
            message: failure.to_string(),
        }));
        Err(failure)
    }

    /// Seed favorites, e.g. from a library query at startup.
    pub fn set_loved_tracks<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.loved.lock().replace(ids);
    }

    pub fn is_track_loved(&self, track_id: &str) -> bool {
        self.inner.loved.lock().contains(track_id)
    }

    pub fn is_love_pending(&self, track_id: &str) -> bool {
        self.inner.loved.lock().is_pending(track_id)
    }

    pub fn loved_track_ids(&self) -> Vec<String> {
        self.inner.loved.lock().ids()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.inner.state.lock().queue.current().cloned()
    }

    pub fn queue(&self) -> Vec<Track> {
        self.inner.state.lock().queue.tracks().to_vec()
    }

    pub fn queue_name(&self) -> Option<String> {
        self.inner.state.lock().queue.name().map(str::to_string)
    }

    pub fn current_index(&self) -> usize {
        self.inner.state.lock().queue.current_index()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.inner.state.lock().session.status
    }

    pub fn is_playing(&self) -> bool {
        self.status().is_playing()
    }

    pub fn is_player_visible(&self) -> bool {
        self.inner.state.lock().visible
    }

    pub fn is_stall_recovery_armed(&self) -> bool {
        self.inner.watchdog.is_armed()
    }
}

impl std::fmt::Debug for QueueController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueController")
            .field("config", &self.inner.config)
            .field("has_session", &self.has_session())
            .field("state", &*self.inner.state.lock())
            .finish()
    }
}

impl Inner {
    fn session(&self) -> Option<Arc<dyn MediaEngine>> {
        self.engine.read().clone()
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is fine.
        let _ = self.events.emit(event);
    }

    fn emit_transition(&self, from: Option<PlaybackStatus>, to: PlaybackStatus) {
        if let Some(from) = from {
            self.emit(CoreEvent::Playback(PlaybackEvent::StatusChanged {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            }));
        }
    }

    fn finish_submission(
        &self,
        submission_id: &str,
        candidate: &QueueCandidate,
        outcome: ResolutionOutcome,
    ) -> Result<()> {
        let attempts = outcome.attempts();
        let (error, cleared) = match outcome {
            ResolutionOutcome::Accepted { attempts } => {
                self.emit(CoreEvent::Queue(QueueEvent::Accepted {
                    submission_id: submission_id.to_string(),
                    track_count: candidate.tracks().len(),
                    start_index: candidate.start_index(),
                    attempts,
                }));
                return Ok(());
            }
            ResolutionOutcome::Unrelated { error, .. } => (PlaybackError::Engine(error), false),
            ResolutionOutcome::AllRejected { .. } => (PlaybackError::NoPlayableTracks, true),
            ResolutionOutcome::Exhausted { attempts } => {
                (PlaybackError::ResolutionExhausted { attempts }, false)
            }
        };

        let transition = {
            let mut state = self.state.lock();
            if cleared {
                let previous = state.session.status;
                state.reset();
                (previous != PlaybackStatus::Idle).then_some(previous)
            } else {
                state.set_status(PlaybackStatus::Idle)
            }
        };
        self.emit_transition(transition, PlaybackStatus::Idle);

        self.emit(CoreEvent::Queue(QueueEvent::Failed {
            submission_id: submission_id.to_string(),
            message: error.to_string(),
            attempts,
            cleared,
        }));
        if cleared {
            self.emit(CoreEvent::Queue(QueueEvent::Cleared {
                reason: "no playable tracks".to_string(),
            }));
        }
        Err(error)
    }

    fn apply_engine_event(self: &Arc<Self>, event: EngineEvent) {
        match event {
            EngineEvent::PlaybackStateDidChange { state: code } => {
                self.apply_engine_state(EngineState::from_code(code))
            }
            EngineEvent::NowPlayingItemDidChange => {
                let item_id = self.session().and_then(|engine| engine.now_playing_item_id());
                let moved = {
                    let mut state = self.state.lock();
                    sync::apply_now_playing(&mut state, item_id.as_deref())
                        .and_then(|index| state.queue.current().map(|t| (index, t.track_id.clone())))
                };
                if let Some((index, track_id)) = moved {
                    self.emit(CoreEvent::Playback(PlaybackEvent::NowPlayingChanged {
                        track_id,
                        index,
                    }));
                }
            }
            EngineEvent::PlaybackTimeDidChange { current_time } => {
                sync::apply_time(&mut self.state.lock(), current_time)
            }
            EngineEvent::PlaybackDurationDidChange { duration } => {
                sync::apply_duration(&mut self.state.lock(), duration)
            }
        }
    }

    fn apply_engine_state(self: &Arc<Self>, engine_state: EngineState) {
        let change = sync::apply_state(&mut self.state.lock(), engine_state);
        if let Some((from, to)) = change.transition {
            self.emit_transition(Some(from), to);
        }

        match change.watchdog {
            WatchdogAction::Cancel => {
                self.watchdog.cancel();
            }
            WatchdogAction::Arm => {
                if !runtime::in_runtime() {
                    warn!("Cannot arm stall watchdog outside a runtime");
                    return;
                }
                let weak = Arc::downgrade(self);
                self.watchdog.arm(move || async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.recover_from_stall().await;
                    }
                });
                self.emit(CoreEvent::Playback(PlaybackEvent::StallDetected {
                    timeout_ms: self.watchdog.timeout().as_millis() as u64,
                }));
            }
        }
    }

    /// Issue stop then play when the engine is still not playing.
    async fn recover_from_stall(&self) {
        let Some(engine) = self.session() else {
            return;
        };
        if engine.is_playing() {
            debug!("Engine resumed on its own; no recovery needed");
            return;
        }

        info!("Stalled recovery: stop -> play");
        let succeeded = {
            let _commands = self.commands.lock().await;
            match engine.stop().await {
                Ok(()) => match engine.play().await {
                    Ok(()) => true,
                    Err(error) => {
                        warn!(error = %error, "Stall recovery play failed");
                        false
                    }
                },
                Err(error) => {
                    warn!(error = %error, "Stall recovery stop failed");
                    false
                }
            }
        };

        let track_id = self
            .state
            .lock()
            .queue
            .current()
            .map(|t| t.track_id.clone());
        self.emit(CoreEvent::Playback(PlaybackEvent::StallRecovery {
            track_id,
            succeeded,
        }));
    }
}

/// Drop tracks without an identifier and map `start_index` into the result.
fn playable_tracks(tracks: Vec<Track>, start_index: usize) -> (Vec<Track>, usize) {
    let target = start_index.min(tracks.len().saturating_sub(1));
    let mut start = None;
    let mut valid = Vec::with_capacity(tracks.len());
    for (index, track) in tracks.into_iter().enumerate() {
        if !track.is_playable() {
            continue;
        }
        if index == target {
            start = Some(valid.len());
        }
        valid.push(track);
    }
    (valid, start.unwrap_or(0))
}
