//! Time-related abstractions.
//!
//! Timers are Tokio's, so tests running with a paused clock
//! (`#[tokio::test(start_paused = true)]`) drive every sleep in the core,
//! including the stall watchdog, without waiting in real time.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(5)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(5));
//! }
//! ```

pub use tokio::time::{error::Elapsed, sleep, timeout, Sleep};

pub use std::time::Duration;
pub use tokio::time::Instant;

/// Converts engine-reported seconds into a [`Duration`].
///
/// Engines report playback time as floating point seconds and occasionally
/// send negative or non-finite values while buffering; those clamp to zero.
pub fn duration_from_secs_f64(secs: f64) -> Duration {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}
