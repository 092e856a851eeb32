//! Bounded most-recent-first list of generated results.

use std::collections::VecDeque;

use crate::engine::GeneratedImage;

pub const DEFAULT_HISTORY_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: u64,
    pub instruction: String,
    pub image: GeneratedImage,
}

#[derive(Debug, Clone)]
pub struct ResultHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for ResultHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ResultHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts at the front and evicts the oldest entries beyond capacity.
    pub fn push(&mut self, instruction: impl Into<String>, image: GeneratedImage) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.entries.push_front(HistoryEntry {
            id,
            instruction: instruction.into(),
            image,
        });
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                tracing::debug!(id = evicted.id, "evicted result from history");
            }
        }
        id
    }

    /// Moves an entry to the front. Returns false when it is no longer held.
    pub fn touch(&mut self, id: u64) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        if let Some(entry) = self.entries.remove(index) {
            self.entries.push_front(entry);
        }
        true
    }

    pub fn get(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}
