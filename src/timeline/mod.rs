mod export;

pub use export::{export_file_name, to_csv, write_csv};

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use crate::model::EmotionReading;

pub const LIVE_CAPACITY: usize = 30;
pub const REVIEW_CAPACITY: usize = 1_000;

/// Append-only, capacity-bounded sequence of classification results; the
/// single source of truth for charts, overlays and export. Oldest entries
/// are evicted on overflow. Written only by the owning session; read by
/// independent consumers through the shared handle.
#[derive(Debug, Clone)]
pub struct Timeline {
    entries: VecDeque<EmotionReading>,
    capacity: usize,
}

pub type SharedTimeline = Arc<RwLock<Timeline>>;

impl Timeline {
    /// Capacity comes from user-editable settings; zero is clamped to one
    /// rather than rejected.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn shared(capacity: usize) -> SharedTimeline {
        Arc::new(RwLock::new(Self::new(capacity)))
    }

    pub fn append(&mut self, reading: EmotionReading) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(reading);
    }

    /// All entries in insertion order.
    pub fn all(&self) -> Vec<EmotionReading> {
        self.entries.iter().cloned().collect()
    }

    /// The most recent `count` entries, newest first.
    pub fn recent(&self, count: usize) -> Vec<EmotionReading> {
        self.entries.iter().rev().take(count).cloned().collect()
    }

    pub fn latest(&self) -> Option<&EmotionReading> {
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
}
