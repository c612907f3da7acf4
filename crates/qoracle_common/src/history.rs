//! Session history: an ordered, bounded log of readings owned by the caller.
//!
//! Lives for the process lifetime only. When full, the oldest entry is
//! evicted and counted so the caller can say "showing last N".

use crate::resonance::ClassificationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One consult: what was offered and what came back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub input: String,
    pub result: ClassificationResult,
}

impl HistoryEntry {
    pub fn new(input: impl Into<String>, result: ClassificationResult) -> Self {
        Self {
            timestamp: Utc::now(),
            input: input.into(),
            result,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    evicted: usize,
}

impl SessionHistory {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            evicted: 0,
        }
    }

    /// Append, evicting the oldest entry when full.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(entry);
    }

    /// Oldest first
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
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

    /// Entries dropped since creation (or the last clear)
    pub fn evicted_count(&self) -> usize {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.evicted = 0;
    }

    /// Mean coherence over the retained entries
    pub fn average_score(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let total: u32 = self.entries.iter().map(|e| u32::from(e.result.score)).sum();
        Some(f64::from(total) / self.entries.len() as f64)
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(50)
    }
}
