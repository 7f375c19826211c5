//! # Event Bus System
//!
//! Broadcasts typed events about sync runs using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus consists of:
//! - **Event Types**: `CoreEvent` wrapping domain event enums
//! - **EventBus**: central broadcast channel for publishing events
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! The sync coordinator publishes one `Started` event per run, one event per
//! reconciled item, and a terminal `Completed`, `Cancelled` or `Failed` event.
//! Hosts subscribe to drive progress indicators or audit logs. Emitting with no
//! subscribers is not an error for the coordinator; it ignores the result.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::Started {
//!     run_id: "run-1".to_string(),
//!     direction: "canonical-to-admin".to_string(),
//!     total_items: 3,
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Sync started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: all senders were dropped; treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, SendError};

pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Reconciliation run events
    Sync(SyncEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::ItemFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Cancelled { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::ItemReconciled { .. }) => EventSeverity::Debug,
        }
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

// ============================================================================
// Sync Events
// ============================================================================

/// Events describing one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Source records fetched, per-item processing about to begin.
    Started {
        run_id: String,
        /// Direction label, e.g. `canonical-to-admin`.
        direction: String,
        /// Number of source records fetched.
        total_items: u64,
    },
    /// One item was written to the target store.
    ItemReconciled {
        run_id: String,
        source_id: String,
        target_id: String,
        /// `true` for a create, `false` for an update.
        created: bool,
    },
    /// One item failed; the run continues.
    ItemFailed {
        run_id: String,
        source_id: String,
        /// Failure kind, e.g. `SlugConflict`.
        reason: String,
        message: String,
    },
    /// Run finished and the report is available.
    Completed {
        run_id: String,
        created: u64,
        updated: u64,
        failed: u64,
        duration_ms: u64,
    },
    /// Run stopped between items because cancellation was requested.
    Cancelled {
        run_id: String,
        processed: u64,
        skipped: u64,
    },
    /// Source records could not be fetched; nothing was processed.
    Failed { run_id: String, message: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::ItemReconciled { .. } => "Item reconciled",
            SyncEvent::ItemFailed { .. } => "Item failed to reconcile",
            SyncEvent::Completed { .. } => "Sync completed",
            SyncEvent::Cancelled { .. } => "Sync cancelled",
            SyncEvent::Failed { .. } => "Sync failed",
        }
    }

    /// Run identifier carried by every sync event
    pub fn run_id(&self) -> &str {
        match self {
            SyncEvent::Started { run_id, .. }
            | SyncEvent::ItemReconciled { run_id, .. }
            | SyncEvent::ItemFailed { run_id, .. }
            | SyncEvent::Completed { run_id, .. }
            | SyncEvent::Cancelled { run_id, .. }
            | SyncEvent::Failed { run_id, .. } => run_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for core events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers falling behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
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

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
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

    /// Drain every event currently buffered
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(Ok(event)) = self.try_recv() {
            events.push(event);
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

    fn started(run_id: &str) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Started {
            run_id: run_id.to_string(),
            direction: "canonical-to-admin".to_string(),
            total_items: 2,
        })
    }

    fn item_failed(run_id: &str) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::ItemFailed {
            run_id: run_id.to_string(),
            source_id: "42".to_string(),
            reason: "SlugConflict".to_string(),
            message: "slug taken".to_string(),
        })
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(8);
        assert!(bus.emit(started("r1")).is_err());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(started("r1")).unwrap(), 2);
        assert_eq!(a.recv().await.unwrap(), started("r1"));
        assert_eq!(b.recv().await.unwrap(), started("r1"));
    }

    #[tokio::test]
    async fn test_stream_filter_skips_non_matching() {
        let bus = EventBus::new(8);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| event.severity() >= EventSeverity::Warning);

        bus.emit(started("r1")).unwrap();
        bus.emit(item_failed("r1")).unwrap();

        let event = stream.recv().await.unwrap();
        assert_eq!(event, item_failed("r1"));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_drain_collects_buffered_events() {
        let bus = EventBus::new(8);
        let mut stream = EventStream::new(bus.subscribe());
        bus.emit(started("r1")).unwrap();
        bus.emit(item_failed("r1")).unwrap();

        let events = stream.drain();
        assert_eq!(events.len(), 2);
        if let CoreEvent::Sync(e) = &events[1] {
            assert_eq!(e.run_id(), "r1");
        }
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&item_failed("r9")).unwrap();
        assert!(json.contains("\"type\":\"Sync\""));
        assert!(json.contains("\"event\":\"ItemFailed\""));

        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item_failed("r9"));
    }

    #[test]
    fn test_severity_mapping() {
        let failed = CoreEvent::Sync(SyncEvent::Failed {
            run_id: "r".to_string(),
            message: "timeout".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(started("r").severity(), EventSeverity::Info);
        assert_eq!(failed.description(), "Sync failed");
    }
}
