//! Scripted in-memory engine shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::{BridgeError, EngineEvent, EngineEventReceiver, MediaEngine, QueueRequest};
use core_async::sync::{broadcast, Notify};
use core_playback::{ControllerConfig, QueueController, Track};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Engine double with scripted `set_queue`/`rate` results and a command log.
pub struct FakeEngine {
    events: broadcast::Sender<EngineEvent>,
    commands: Mutex<Vec<&'static str>>,
    requests: Mutex<Vec<QueueRequest>>,
    queue_results: Mutex<VecDeque<Result<()>>>,
    queue_reports: Mutex<VecDeque<Vec<&'static str>>>,
    rate_results: Mutex<VecDeque<Result<bool>>>,
    rated: Mutex<Vec<(&'static str, String)>>,
    rate_gate: Mutex<Option<Arc<Notify>>>,
    now_playing: Mutex<Option<String>>,
    playing: AtomicBool,
    authorized: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            events,
            commands: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            queue_results: Mutex::new(VecDeque::new()),
            queue_reports: Mutex::new(VecDeque::new()),
            rate_results: Mutex::new(VecDeque::new()),
            rated: Mutex::new(Vec::new()),
            rate_gate: Mutex::new(None),
            now_playing: Mutex::new(None),
            playing: AtomicBool::new(false),
            authorized: AtomicBool::new(true),
        })
    }

    /// Queue the result of the next `set_queue` call. Unscripted calls succeed.
    pub fn script_queue(&self, result: Result<()>) {
        self.queue_results.lock().push_back(result);
    }

    /// Reject the next `set_queue` call with a resolution error naming `ids`.
    pub fn reject_ids(&self, ids: &[&str]) {
        self.script_queue(Err(BridgeError::Rejected(format!(
            "MEDIA_ERR: The following items could not be resolved: {}",
            ids.join(", ")
        ))));
    }

    /// While the next `set_queue` call is in flight, report each of `ids` in
    /// turn as the now-playing item, letting subscribers run after each one.
    pub fn report_during_queue(&self, ids: &[&'static str]) {
        self.queue_reports.lock().push_back(ids.to_vec());
    }

    /// Queue the result of the next `rate`/`unrate` call. Unscripted calls succeed.
    pub fn script_rating(&self, result: Result<bool>) {
        self.rate_results.lock().push_back(result);
    }

    /// Make rating calls wait until the returned handle is notified.
    pub fn gate_ratings(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.rate_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn set_now_playing(&self, id: Option<&str>) {
        *self.now_playing.lock() = id.map(str::to_string);
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub fn commands(&self) -> Vec<&'static str> {
        self.commands.lock().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands.lock().iter().filter(|c| **c == command).count()
    }

    pub fn requests(&self) -> Vec<QueueRequest> {
        self.requests.lock().clone()
    }

    pub fn rated(&self) -> Vec<(&'static str, String)> {
        self.rated.lock().clone()
    }

    fn record(&self, command: &'static str) {
        self.commands.lock().push(command);
    }

    async fn rating(&self, command: &'static str, track_id: &str) -> Result<bool> {
        self.record(command);
        self.rated.lock().push((command, track_id.to_string()));
        let gate = self.rate_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.rate_results.lock().pop_front().unwrap_or(Ok(true))
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn now_playing_item_id(&self) -> Option<String> {
        self.now_playing.lock().clone()
    }

    fn subscribe_events(&self) -> EngineEventReceiver {
        self.events.subscribe()
    }

    async fn stop(&self) -> Result<()> {
        self.record("stop");
        Ok(())
    }

    async fn set_queue(&self, request: QueueRequest) -> Result<()> {
        self.record("set_queue");
        self.requests.lock().push(request);
        let reports = self.queue_reports.lock().pop_front().unwrap_or_default();
        for id in reports {
            self.set_now_playing(Some(id));
            self.emit(EngineEvent::NowPlayingItemDidChange);
            settle().await;
        }
        self.queue_results.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn play(&self) -> Result<()> {
        self.record("play");
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause");
        Ok(())
    }

    async fn skip_to_next(&self) -> Result<()> {
        self.record("skip_to_next");
        Ok(())
    }

    async fn skip_to_previous(&self) -> Result<()> {
        self.record("skip_to_previous");
        Ok(())
    }

    async fn seek_to_time(&self, _time: f64) -> Result<()> {
        self.record("seek_to_time");
        Ok(())
    }

    async fn rate(&self, track_id: &str) -> Result<bool> {
        self.rating("rate", track_id).await
    }

    async fn unrate(&self, track_id: &str) -> Result<bool> {
        self.rating("unrate", track_id).await
    }
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter()
        .map(|id| Track::new(*id, format!("Track {id}")))
        .collect()
}

pub fn ids(tracks: &[Track]) -> Vec<&str> {
    tracks.iter().map(|t| t.track_id.as_str()).collect()
}

/// Controller with `engine` attached but events not bound.
pub fn controller_with(engine: &Arc<FakeEngine>, config: ControllerConfig) -> QueueController {
    let controller = QueueController::new(config).unwrap();
    controller.attach_session(engine.clone());
    controller
}

/// Let spawned tasks (event subscription, watchdog) run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
