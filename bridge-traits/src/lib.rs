//! # Host Bridge Traits
//!
//! Contracts between the playback core and the host application.
//!
//! ## Overview
//!
//! The core does not decode or render audio. It drives an external media
//! engine that the host owns (a web player, a native media framework, a
//! remote device) and forwards its logs to the host's logging pipeline. Each
//! of those capabilities is a trait here, implemented per platform.
//!
//! ## Traits
//!
//! - [`MediaEngine`](engine::MediaEngine) - queue, transport and rating commands plus the engine's event stream
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails with a descriptive error when a capability it needs at
//! startup is missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let engine = config.engine
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "MediaEngine".to_string(),
//!         message: "No media engine session provided.".to_string(),
//!     })?;
//! ```
//!
//! A missing engine *session* at runtime is not an error: the playback
//! controller treats every command as a no-op until a session is attached.
//!
//! ## Error Handling
//!
//! All bridge traits return [`BridgeError`](error::BridgeError). Engine
//! adapters should preserve the engine's own rejection message in
//! [`BridgeError::Rejected`]: the playback core parses it to find
//! identifiers the engine could not resolve.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! async tasks as `Arc<dyn Trait>`.

pub mod engine;
pub mod error;
pub mod logging;

pub use error::BridgeError;

// Re-export commonly used types
pub use engine::{EngineEvent, EngineEventReceiver, EngineState, MediaEngine, QueueRequest};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
