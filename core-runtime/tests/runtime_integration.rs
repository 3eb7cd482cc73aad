//! Integration tests for logging initialisation, configuration and the event bus

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventSeverity, FavoriteEvent, QueueEvent};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for RecordingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// Installs the global subscriber, so it is the only test in this binary that
// calls `init_logging`.
#[test]
fn test_init_logging_forwards_to_sink_and_rejects_reinit() {
    let sink = Arc::new(RecordingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(target: "core_playback::controller", track_id = "t-1", "queue accepted");
    tracing::debug!(target: "hyper::proto", "filtered out by the default directive");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "queue accepted");
        assert_eq!(entries[0].fields.get("track_id"), Some(&"t-1".to_string()));
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}

#[tokio::test]
async fn test_config_event_bus_delivers_domain_events() {
    let config = CoreConfig::builder().event_buffer_size(16).build().unwrap();
    let bus = config.event_bus();
    let mut stream = bus
        .stream()
        .filter(|event| event.severity() >= EventSeverity::Warning);

    bus.emit(CoreEvent::Queue(QueueEvent::Cleared {
        reason: "closed".to_string(),
    }))
    .ok();
    let failed = CoreEvent::Favorite(FavoriteEvent::LoveFailed {
        track_id: "t-1".to_string(),
        message: "refused".to_string(),
    });
    bus.emit(failed.clone()).ok();

    assert_eq!(stream.recv().await.unwrap(), failed);
}
