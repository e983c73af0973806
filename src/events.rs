//! Event Log
//!
//! Bounded, newest-first log of everything the simulator does. Entries are
//! what `GET /api/log` returns and are mirrored to `tracing` as they arrive.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of entries kept
pub const EVENT_LOG_CAPACITY: usize = 50;

/// Kind of event, serialized as the upper-case tag clients filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    StrongWrite,
    WeakWriteStart,
    WeakReplicationEnd,
    EventualBatchStart,
    EventualBatchEnd,
}

impl EventKind {
    /// Wire tag of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StrongWrite => "STRONG_WRITE",
            EventKind::WeakWriteStart => "WEAK_WRITE_START",
            EventKind::WeakReplicationEnd => "WEAK_REPLICATION_END",
            EventKind::EventualBatchStart => "EVENTUAL_BATCH_START",
            EventKind::EventualBatchEnd => "EVENTUAL_BATCH_END",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEntry {
    /// Local wall-clock time, `HH.MM.SS`
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    pub details: Map<String, Value>,
}

/// Ring buffer of events, newest at index 0
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<EventEntry>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    /// Create an empty log holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Record an event at the front, dropping the oldest past capacity
    pub fn record(&mut self, kind: EventKind, message: impl Into<String>, details: Value) -> &EventEntry {
        let details = match details {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        let entry = EventEntry {
            timestamp: chrono::Local::now().format("%H.%M.%S").to_string(),
            kind,
            message: message.into(),
            details,
        };
        tracing::info!("[LOG {}] {}: {}", entry.kind, entry.timestamp, entry.message);

        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        &self.entries[0]
    }

    /// All entries, newest first
    pub fn snapshot(&self) -> Vec<EventEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&EventEntry> {
        self.entries.front()
    }
}
