//! Workspace umbrella crate.
//!
//! Host applications can depend on `playq-workspace` alone and reach the
//! controller, the runtime helpers and the engine contract through the
//! re-exports below instead of wiring each crate individually.

pub use bridge_traits as bridge;
pub use core_playback as playback;
pub use core_runtime as runtime;

pub use core_playback::{PlaybackError, QueueController, Track};
