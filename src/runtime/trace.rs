//! Trace records emitted by steps
//!
//! Every step execution produces a human-readable line for operators. The
//! runtime keeps a bounded log of them alongside the `tracing` output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::state::format_real;

/// One trace line produced by a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Resolved target name
    pub target: String,
    /// Value written to the response state
    pub value: f64,
    /// Row that supplied the value, if any
    pub matched_row: Option<usize>,
    /// Formatted message
    pub message: String,
    /// Wall-clock time the record was produced
    pub recorded_at: DateTime<Utc>,
}

impl TraceRecord {
    /// Record for a completed lookup
    pub fn lookup(target: &str, value: f64, matched_row: Option<usize>) -> Self {
        Self {
            target: target.to_string(),
            value,
            matched_row,
            message: format!(
                "The value for '{}' is '{}'.",
                target,
                format_real(value)
            ),
            recorded_at: Utc::now(),
        }
    }
}

/// Trace record tagged with the visit that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Visit counter at the time of the record
    pub visit: u64,
    /// Step that produced the record
    pub step: String,
    /// The record itself
    pub record: TraceRecord,
}

/// Bounded trace log; oldest entries are evicted first
#[derive(Debug, Clone)]
pub struct TraceLog {
    entries: VecDeque<TraceEntry>,
    capacity: usize,
}

impl TraceLog {
    /// Create a log retaining at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append an entry
    pub fn push(&mut self, entry: TraceEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Iterate over retained entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.back()
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(visit: u64) -> TraceEntry {
        TraceEntry {
            visit,
            step: "Lookup1".into(),
            record: TraceRecord::lookup("ABC", visit as f64, Some(0)),
        }
    }

    #[test]
    fn test_message_format() {
        let record = TraceRecord::lookup("ABC", 42.0, Some(1));
        assert_eq!(record.message, "The value for 'ABC' is '42'.");

        let record = TraceRecord::lookup("x", 7.5, None);
        assert_eq!(record.message, "The value for 'x' is '7.5'.");

        let record = TraceRecord::lookup("y", 0.1 + 0.2, Some(0));
        assert_eq!(record.message, "The value for 'y' is '0.3'.");

        let record = TraceRecord::lookup("z", f64::INFINITY, Some(0));
        assert_eq!(record.message, "The value for 'z' is 'Infinity'.");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = TraceLog::new(2);
        log.push(entry(1));
        log.push(entry(2));
        log.push(entry(3));

        let visits: Vec<u64> = log.entries().map(|e| e.visit).collect();
        assert_eq!(visits, vec![2, 3]);
        assert_eq!(log.last().unwrap().visit, 3);
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let mut log = TraceLog::new(0);
        log.push(entry(1));
        assert!(log.is_empty());
    }
}
