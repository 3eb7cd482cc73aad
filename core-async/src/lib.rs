//! Runtime facade for the PlayQ playback core.
//!
//! Every `core-*` crate goes through this crate for task spawning, timers and
//! async-aware locks instead of depending on Tokio directly. Keeping the seam
//! in one place means the controller, the event synchronizer and the stall
//! watchdog all agree on which clock and which executor they run on, which is
//! what makes paused-clock tests of the watchdog deterministic.
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, timeouts, instants
//! - `sync`: Async locks and channels
//! - `runtime`: Blocking entry point for synchronous hosts
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

// Re-export commonly used types at crate root for convenience
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
