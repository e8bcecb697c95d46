//! # Event Bus System
//!
//! Progress reporting for catalog runs over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`CatalogEvent`], one variant per state-changing action
//!   plus run lifecycle markers
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! Every insert, update, delete and skip performed by a run is announced by
//! exactly one event. Emitting with nobody listening is not an error; callers
//! discard the send result with `.ok()`.
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐     subscribe    ┌────────────┐
//! │ Sync Engine ├──────────────>│ EventBus  ├─────────────────>│ Subscriber │
//! └─────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CatalogEvent, EventBus, RunKind};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CatalogEvent::RunStarted { catalog_id: 1, run: RunKind::Add })
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Catalog run started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//! - **`RecvError::Closed`**: All senders have been dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Reconciliation procedure a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Add,
    Verify,
    Clean,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Add => write!(f, "add"),
            RunKind::Verify => write!(f, "verify"),
            RunKind::Clean => write!(f, "clean"),
        }
    }
}

/// Counters reported when a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    /// Files or records looked at.
    pub processed: u64,
    pub added: u64,
    pub updated: u64,
    pub removed: u64,
    pub skipped: u64,
    /// Per-item failures that were logged and passed over.
    pub failed: u64,
}

/// Progress event emitted by catalog runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    RunStarted {
        catalog_id: i64,
        run: RunKind,
    },
    /// A new record was inserted.
    RecordAdded {
        catalog_id: i64,
        record_id: i64,
        file: String,
    },
    /// A record's tag fields changed and were written back.
    RecordUpdated {
        catalog_id: i64,
        record_id: i64,
        file: String,
    },
    /// A record was deleted because its remote file is gone.
    RecordRemoved {
        catalog_id: i64,
        record_id: i64,
        file: String,
    },
    /// A record was verified and nothing changed.
    RecordChecked {
        catalog_id: i64,
        record_id: i64,
        file: String,
    },
    /// A file or record was passed over.
    FileSkipped {
        catalog_id: i64,
        file: String,
        reason: String,
    },
    Warning {
        catalog_id: i64,
        message: String,
    },
    RunCompleted {
        catalog_id: i64,
        run: RunKind,
        totals: RunTotals,
    },
    RunFailed {
        catalog_id: i64,
        run: RunKind,
        message: String,
    },
    RunCancelled {
        catalog_id: i64,
        run: RunKind,
        totals: RunTotals,
    },
}

impl CatalogEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CatalogEvent::RunStarted { .. } => "Catalog run started",
            CatalogEvent::RecordAdded { .. } => "Record added",
            CatalogEvent::RecordUpdated { .. } => "Record updated",
            CatalogEvent::RecordRemoved { .. } => "Record removed",
            CatalogEvent::RecordChecked { .. } => "Record checked",
            CatalogEvent::FileSkipped { .. } => "File skipped",
            CatalogEvent::Warning { .. } => "Catalog warning",
            CatalogEvent::RunCompleted { .. } => "Catalog run completed",
            CatalogEvent::RunFailed { .. } => "Catalog run failed",
            CatalogEvent::RunCancelled { .. } => "Catalog run cancelled",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CatalogEvent::RunFailed { .. } => EventSeverity::Error,
            CatalogEvent::Warning { .. } => EventSeverity::Warning,
            CatalogEvent::RunStarted { .. }
            | CatalogEvent::RunCompleted { .. }
            | CatalogEvent::RunCancelled { .. }
            | CatalogEvent::RecordAdded { .. }
            | CatalogEvent::RecordRemoved { .. } => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    pub fn catalog_id(&self) -> i64 {
        match self {
            CatalogEvent::RunStarted { catalog_id, .. }
            | CatalogEvent::RecordAdded { catalog_id, .. }
            | CatalogEvent::RecordUpdated { catalog_id, .. }
            | CatalogEvent::RecordRemoved { catalog_id, .. }
            | CatalogEvent::RecordChecked { catalog_id, .. }
            | CatalogEvent::FileSkipped { catalog_id, .. }
            | CatalogEvent::Warning { catalog_id, .. }
            | CatalogEvent::RunCompleted { catalog_id, .. }
            | CatalogEvent::RunFailed { catalog_id, .. }
            | CatalogEvent::RunCancelled { catalog_id, .. } => *catalog_id,
        }
    }

    /// Whether the event reports a change to, or skip of, a single item.
    pub fn is_item_event(&self) -> bool {
        matches!(
            self,
            CatalogEvent::RecordAdded { .. }
                | CatalogEvent::RecordUpdated { .. }
                | CatalogEvent::RecordRemoved { .. }
                | CatalogEvent::RecordChecked { .. }
                | CatalogEvent::FileSkipped { .. }
        )
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Broadcast channel for [`CatalogEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CatalogEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A subscriber that falls behind by more than `capacity` events
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CatalogEvent) -> Result<usize, SendError<CatalogEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CatalogEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CatalogEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CatalogEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let removals = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CatalogEvent::RecordRemoved { .. }));
/// ```
pub struct EventStream {
    receiver: Receiver<CatalogEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CatalogEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CatalogEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CatalogEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CatalogEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CatalogEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every event currently buffered that passes the filter.
    pub fn drain(&mut self) -> Vec<CatalogEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added(file: &str) -> CatalogEvent {
        CatalogEvent::RecordAdded {
            catalog_id: 1,
            record_id: 10,
            file: file.to_string(),
        }
    }

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut receiver = bus.subscribe();

        assert_eq!(bus.emit(added("Music|/|a.mp3")).unwrap(), 1);
        assert_eq!(receiver.recv().await.unwrap(), added("Music|/|a.mp3"));
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::default();
        assert!(bus.emit(added("x")).is_err());
    }

    #[tokio::test]
    async fn test_stream_filter() {
        let bus = EventBus::new(16);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CatalogEvent::Warning { .. }));

        bus.emit(added("a")).ok();
        bus.emit(CatalogEvent::Warning {
            catalog_id: 1,
            message: "No media updated".to_string(),
        })
        .ok();

        let event = stream.recv().await.unwrap();
        assert_eq!(event.severity(), EventSeverity::Warning);
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_drain_collects_buffered_events() {
        let bus = EventBus::new(16);
        let mut stream = EventStream::new(bus.subscribe());

        bus.emit(CatalogEvent::RunStarted {
            catalog_id: 1,
            run: RunKind::Clean,
        })
        .ok();
        bus.emit(added("a")).ok();

        let events = stream.drain();
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_item_event());
        assert!(events[1].is_item_event());
    }

    #[test]
    fn test_event_serialization() {
        let event = CatalogEvent::FileSkipped {
            catalog_id: 2,
            file: "Music|/|clip.mp4".to_string(),
            reason: "video ingestion not implemented".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "FileSkipped");
        assert_eq!(json["reason"], "video ingestion not implemented");

        let back: CatalogEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.catalog_id(), 2);
    }

    #[test]
    fn test_run_kind_display() {
        assert_eq!(RunKind::Verify.to_string(), "verify");
        let totals = RunTotals {
            added: 2,
            ..RunTotals::default()
        };
        let json = serde_json::to_value(CatalogEvent::RunCompleted {
            catalog_id: 1,
            run: RunKind::Add,
            totals,
        })
        .unwrap();
        assert_eq!(json["run"], "add");
        assert_eq!(json["totals"]["added"], 2);
    }
}
