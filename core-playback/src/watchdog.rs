//! # Stall Watchdog
//!
//! Single-shot timer that forces a recovery when playback sits in a
//! waiting/stalled state for too long.
//!
//! At most one timer is pending. Arming replaces the pending timer, and
//! cancelling aborts it. Once the timer fires, the recovery future is
//! detached from the watchdog: a cancel arriving mid-recovery no longer
//! interrupts it, so a `stop` is never left without its `play`.

use core_async::task::{self, JoinHandle};
use core_async::time::{sleep, Duration};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug)]
struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    pending: Option<Pending>,
}

#[derive(Debug)]
pub struct StallWatchdog {
    timeout: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl StallWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start the timer, replacing any pending one. `on_fire` runs once the
    /// timeout elapses without a cancel.
    ///
    /// Must be called from within a runtime.
    pub fn arm<F, Fut>(&self, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.pending.take() {
            previous.handle.abort();
        }

        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        let timeout = self.timeout;
        let shared = Arc::clone(&self.slot);

        let handle = task::spawn(async move {
            sleep(timeout).await;
            {
                let mut slot = shared.lock();
                match &slot.pending {
                    Some(pending) if pending.generation == generation => {
                        slot.pending = None;
                    }
                    _ => return,
                }
            }
            debug!(timeout_ms = timeout.as_millis() as u64, "Stall watchdog fired");
            on_fire().await;
        });

        slot.pending = Some(Pending { generation, handle });
        trace!(generation, "Stall watchdog armed");
    }

    /// Abort the pending timer. Returns `true` if one was pending.
    pub fn cancel(&self) -> bool {
        match self.slot.lock().pending.take() {
            Some(pending) => {
                pending.handle.abort();
                trace!(generation = pending.generation, "Stall watchdog cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().pending.is_some()
    }
}

impl Drop for StallWatchdog {
    fn drop(&mut self) {
        self.cancel();
    }
}
