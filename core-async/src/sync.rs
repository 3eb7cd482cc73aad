//! Synchronization primitives.
//!
//! Async-aware locks and channels. The controller serializes engine commands
//! through [`Mutex`] (held across `.await`), and engine events travel over
//! [`broadcast`] channels.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::Mutex;
//!
//! async fn example() {
//!     let mutex = Mutex::new(42);
//!     let mut guard = mutex.lock().await;
//!     *guard += 1;
//! }
//! ```

pub use tokio::sync::{broadcast, Mutex, MutexGuard, Notify};
