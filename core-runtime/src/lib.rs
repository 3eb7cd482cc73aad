//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Other crates in the workspace depend on this one for their logging
//! conventions, their fail-fast configuration errors, and the broadcast bus
//! the playback controller publishes its domain events on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
