//! Queue controller demonstration
//!
//! Drives the controller against a simulated engine that cannot resolve some
//! catalog entries and stalls once mid-playback.
//!
//! Run with:
//! ```bash
//! cargo run -p core-playback --example queue_demo
//!
//! # JSON logs, everything from the controller
//! cargo run -p core-playback --example queue_demo -- json "core_playback=trace"
//! ```

use anyhow::Context;
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, EngineEvent, EngineEventReceiver, EngineState, LogLevel, MediaEngine,
    QueueRequest,
};
use core_async::sync::broadcast;
use core_playback::{ControllerConfig, QueueController, Track};
use core_runtime::config::CoreConfig;
use core_runtime::events::CoreEvent;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Engine that cannot play anything in `unlicensed` and reports state changes
/// for the commands it receives.
struct SimulatedEngine {
    events: broadcast::Sender<EngineEvent>,
    unlicensed: HashSet<String>,
    queue: Mutex<Vec<String>>,
    position: Mutex<usize>,
    playing: AtomicBool,
}

impl SimulatedEngine {
    fn new(unlicensed: &[&str]) -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            events,
            unlicensed: unlicensed.iter().map(|id| id.to_string()).collect(),
            queue: Mutex::new(Vec::new()),
            position: Mutex::new(0),
            playing: AtomicBool::new(false),
        })
    }

    fn publish_state(&self, state: EngineState) {
        self.playing.store(state.is_playing(), Ordering::SeqCst);
        let _ = self.events.send(EngineEvent::state_changed(state));
    }

    fn jump(&self, offset: isize) {
        let len = self.queue.lock().len();
        {
            let mut position = self.position.lock();
            *position = position.saturating_add_signed(offset).min(len.saturating_sub(1));
        }
        let _ = self.events.send(EngineEvent::NowPlayingItemDidChange);
        let _ = self.events.send(EngineEvent::PlaybackDurationDidChange { duration: 215.0 });
    }
}

#[async_trait]
impl MediaEngine for SimulatedEngine {
    fn is_authorized(&self) -> bool {
        true
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn now_playing_item_id(&self) -> Option<String> {
        let queue = self.queue.lock();
        queue.get(*self.position.lock()).cloned()
    }

    fn subscribe_events(&self) -> EngineEventReceiver {
        self.events.subscribe()
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.publish_state(EngineState::Stopped);
        Ok(())
    }

    async fn set_queue(&self, request: QueueRequest) -> BridgeResult<()> {
        let rejected: Vec<&str> = request
            .ids
            .iter()
            .filter(|id| self.unlicensed.contains(*id))
            .map(String::as_str)
            .collect();
        if !rejected.is_empty() {
            return Err(BridgeError::Rejected(format!(
                "MEDIA_ERR: The following items could not be resolved: {}",
                rejected.join(", ")
            )));
        }

        *self.queue.lock() = request.ids.clone();
        *self.position.lock() = request.start_with.unwrap_or(0);
        self.jump(0);
        if request.start_playing {
            self.publish_state(EngineState::Playing);
        }
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.publish_state(EngineState::Playing);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.publish_state(EngineState::Paused);
        Ok(())
    }

    async fn skip_to_next(&self) -> BridgeResult<()> {
        self.jump(1);
        Ok(())
    }

    async fn skip_to_previous(&self) -> BridgeResult<()> {
        self.jump(-1);
        Ok(())
    }

    async fn seek_to_time(&self, time: f64) -> BridgeResult<()> {
        let _ = self
            .events
            .send(EngineEvent::PlaybackTimeDidChange { current_time: time });
        Ok(())
    }

    async fn rate(&self, _track_id: &str) -> BridgeResult<bool> {
        Ok(true)
    }

    async fn unrate(&self, _track_id: &str) -> BridgeResult<bool> {
        Ok(true)
    }
}

fn album() -> Vec<Track> {
    [
        ("i.1001", "Opening"),
        ("i.1002", "Unlicensed Interlude"),
        ("i.1003", "Main Theme"),
        ("i.1004", "Region Locked"),
        ("i.1005", "Finale"),
    ]
    .into_iter()
    .map(|(id, title)| {
        Track::new(id, title)
            .with_artist("Demo Ensemble")
            .with_album("Demo Album")
            .with_duration_ms(215_000)
    })
    .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut logging = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug);
    if let Some(filter) = args.get(2) {
        logging = logging.with_filter(filter.clone());
    }

    let engine = SimulatedEngine::new(&["i.1002", "i.1004"]);
    let core = CoreConfig::builder()
        .engine(engine.clone())
        .logging(logging.clone())
        .build()
        .context("invalid core configuration")?;
    init_logging(logging).context("failed to initialise logging")?;

    let config = ControllerConfig::default().with_stall_timeout(Duration::from_millis(500));
    let controller = QueueController::from_core_config(&core, config)?;
    let mut events = controller.subscribe_events();
    controller.bind_events();

    info!("Submitting album with two unplayable tracks");
    controller
        .submit_queue(album(), 2, Some("Demo Album".to_string()))
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = controller.snapshot();
    info!(
        queue_len = snapshot.queue.len(),
        current = ?snapshot.current_track.map(|t| t.title),
        status = %snapshot.status,
        "Queue accepted"
    );

    controller.next().await?;
    controller.seek(42.0).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    info!("Simulating a stalled stream");
    engine.publish_state(EngineState::Stalled);
    tokio::time::sleep(Duration::from_millis(800)).await;

    if let Some(track) = controller.current_track() {
        let loved = controller.toggle_love(&track.track_id).await?;
        info!(track_id = %track.track_id, ?loved, "Toggled favorite");
    }

    controller.close().await;

    for event in events.drain() {
        match &event {
            CoreEvent::Queue(queue) => info!(?queue, "{}", event.description()),
            CoreEvent::Playback(playback) => info!(?playback, "{}", event.description()),
            CoreEvent::Favorite(favorite) => info!(?favorite, "{}", event.description()),
        }
    }

    Ok(())
}
