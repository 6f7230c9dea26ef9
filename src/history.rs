//! Bounded, newest-first record of executed queries.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub sql: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    /// 0 for failed runs.
    pub row_count: usize,
    /// Present iff the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryEntry {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLedger {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLedger {
    /// A ledger holding at most `capacity` entries (a capacity of 0 is treated as 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Rebuild a ledger from stored entries in any order.
    ///
    /// Keeps the newest `capacity` by id and continues numbering after the highest id seen.
    pub fn restore(capacity: usize, mut stored: Vec<HistoryEntry>) -> Self {
        let mut ledger = Self::new(capacity);
        stored.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(newest) = stored.first() {
            ledger.next_id = newest.id + 1;
        }
        stored.truncate(ledger.capacity);
        ledger.entries = stored.into();
        ledger
    }

    /// Prepend an entry for a finished run and return it.
    pub fn record(
        &mut self,
        sql: &str,
        duration: Duration,
        row_count: usize,
        error: Option<String>,
    ) -> &HistoryEntry {
        let row_count = if error.is_some() { 0 } else { row_count };
        let entry = HistoryEntry {
            id: self.next_id,
            sql: sql.trim().to_string(),
            timestamp: Utc::now(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            row_count,
            error,
        };
        self.next_id += 1;
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        &self.entries[0]
    }

    /// SQL text of entry `id`, if it is still retained.
    pub fn replay(&self, id: u64) -> Option<&str> {
        self.get(id).map(|e| e.sql.as_str())
    }

    pub fn get(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Newest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
