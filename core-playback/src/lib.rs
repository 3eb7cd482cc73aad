//! # Playback Queue Controller
//!
//! Owns the notion of "what is playing" and keeps it consistent with an
//! external media engine.
//!
//! ## Overview
//!
//! This module handles:
//! - Queue construction from a track list, with a start position and name
//! - Resubmitting queues the engine partially rejects, minus the rejected tracks
//! - Folding the engine's event stream into the local player state
//! - Recovering playback when the engine stalls
//! - The favorite (love) toggle with in-flight protection
//!
//! Audio is never decoded here. Everything goes through
//! [`bridge_traits::MediaEngine`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{ControllerConfig, QueueController, Track};
//!
//! let controller = QueueController::new(ControllerConfig::default())?;
//! controller.attach_session(engine);
//! controller.bind_events();
//!
//! let tracks = vec![Track::new("i.abc", "Intro"), Track::new("i.def", "Outro")];
//! controller.submit_queue(tracks, 1, Some("Album".into())).await?;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod loved;
pub mod model;
pub mod queue;
pub mod resolution;
pub mod sync;
pub mod watchdog;

pub use config::ControllerConfig;
pub use controller::QueueController;
pub use error::{PlaybackError, Result};
pub use loved::LovedSet;
pub use model::{PlaybackSession, PlaybackStatus, PlayerSnapshot, Track};
pub use queue::Queue;
pub use resolution::{parse_rejected_ids, QueueCandidate, ResolutionOutcome};
pub use watchdog::StallWatchdog;
