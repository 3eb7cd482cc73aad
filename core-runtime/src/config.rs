//! # Core Configuration Module
//!
//! Builder-based configuration for hosts embedding the playback core.
//!
//! ## Overview
//!
//! `CoreConfig` carries the host-provided media engine session (if one is
//! already available), the event bus capacity and the logging setup. The
//! builder validates eagerly so a misconfigured host fails at startup with an
//! actionable message rather than later at the first command.
//!
//! The engine session is optional by default: hosts usually obtain it after
//! an interactive authorization flow and attach it to the controller later.
//! Hosts that always start with a session can call
//! [`CoreConfigBuilder::require_engine`] to make its absence an error.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .engine(Arc::new(MyEngine::connect()?))
//!     .event_buffer_size(256)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Panics: a session was required but none was provided
//! let config = CoreConfig::builder()
//!     .require_engine(true)
//!     .build()
//!     .expect("Should fail - missing media engine");
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use crate::logging::LoggingConfig;
use bridge_traits::MediaEngine;
use std::sync::Arc;

/// Upper bound on the event bus buffer.
const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Core configuration for the playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Authorized media engine session, if the host already has one
    pub engine: Option<Arc<dyn MediaEngine>>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    pub logging: LoggingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field(
                "engine",
                &self.engine.as_ref().map(|_| "MediaEngine { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("logging", &self.logging)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks that the event buffer is non-zero and below
    /// 65,536 events per subscriber.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {} events",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }

    /// Creates an event bus sized by this configuration.
    pub fn event_bus(&self) -> EventBus {
        EventBus::new(self.event_buffer_size)
    }
}

fn engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaEngine".to_string(),
        message: "A media engine session is required by this host configuration. \
                 Complete the authorization flow before building the core config, \
                 or leave `require_engine` disabled and attach the session later."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and produce the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    engine: Option<Arc<dyn MediaEngine>>,
    require_engine: bool,
    event_buffer_size: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the authorized media engine session.
    pub fn engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Makes a missing engine session a build error.
    pub fn require_engine(mut self, require: bool) -> Self {
        self.require_engine = require;
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when `require_engine` is set without an engine
    /// - [`Error::Config`] when the event buffer size is out of range
    pub fn build(self) -> Result<CoreConfig> {
        if self.require_engine && self.engine.is_none() {
            return Err(engine_missing_error());
        }

        let config = CoreConfig {
            engine: self.engine,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
