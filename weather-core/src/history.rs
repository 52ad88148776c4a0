use std::collections::VecDeque;

use crate::model::WeatherRecord;

/// How many successful lookups are retained.
pub const HISTORY_CAPACITY: usize = 5;

/// Bounded, insertion-ordered store of the most recent successful
/// lookups. Owned by one engine instance; never shared.
#[derive(Debug, Default)]
pub struct History {
    entries: VecDeque<WeatherRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, evicting the oldest entry once the store holds
    /// more than [`HISTORY_CAPACITY`] records.
    pub fn record(&mut self, record: WeatherRecord) {
        self.entries.push_back(record);
        if self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    /// Recent lookups, most recent first. Empty store yields an empty
    /// sequence; rendering a "no history" message is the caller's job.
    pub fn recent(&self) -> Vec<&WeatherRecord> {
        self.entries.iter().rev().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
