//! Integration tests for global logging initialization
//!
//! The global subscriber can only be installed once per process, so the
//! whole lifecycle is exercised from a single test.

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CapturingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CapturingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[test]
fn test_global_logging_forwards_to_host_sink() {
    let sink = Arc::new(CapturingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(
        target: "core_sync",
        library = "Music",
        password = "hunter2",
        "Catalog run started"
    );
    // below the sink's minimum level
    tracing::debug!(target: "core_sync", "Skipping file");
    // dependencies are filtered to warn
    tracing::info!(target: "reqwest", "connection pooled");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Catalog run started");
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].fields.get("library"), Some(&"Music".to_string()));
        assert_eq!(
            entries[0].fields.get("password"),
            Some(&"[REDACTED]".to_string())
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}
