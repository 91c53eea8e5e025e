//! In-memory activity log for tests and embedding callers.

use crate::logger::ActivityLog;
use crate::logger::jsonl::{EventType, LogEntry, Severity};

/// Collects every recorded entry in order.
#[derive(Debug, Default)]
pub struct MemoryLog {
    /// Recorded entries, oldest first.
    pub entries: Vec<LogEntry>,
}

impl MemoryLog {
    /// Empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Entries of one event type, in recording order.
    pub fn events(&self, event: EventType) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.event == event)
    }

    /// Number of entries of one event type.
    #[must_use]
    pub fn count(&self, event: EventType) -> usize {
        self.events(event).count()
    }

    /// Number of entries at one severity.
    #[must_use]
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }
}

impl ActivityLog for MemoryLog {
    fn record(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }
}
