//! Bounded snapshot history
//!
//! Fixed-capacity ring of the most recent snapshots. Slots are overwritten
//! oldest-first, so memory stays flat however long the run is.

use crate::{Result, TopologyError, TopologySnapshot};
use std::sync::Arc;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    slots: Vec<Option<Arc<TopologySnapshot>>>,
    /// Next slot to write
    head: usize,
    len: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TopologyError::ZeroHistoryCapacity);
        }
        Ok(Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `snapshot`, returning the evicted oldest entry when full
    pub fn push(&mut self, snapshot: Arc<TopologySnapshot>) -> Option<Arc<TopologySnapshot>> {
        let evicted = self.slots[self.head].replace(snapshot);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        evicted
    }

    fn slot(&self, offset: usize) -> Option<&TopologySnapshot> {
        if offset >= self.len {
            return None;
        }
        let start = (self.head + self.capacity() - self.len) % self.capacity();
        self.slots[(start + offset) % self.capacity()].as_deref()
    }

    /// `index` 0 is the oldest retained snapshot
    pub fn get(&self, index: usize) -> Option<&TopologySnapshot> {
        self.slot(index)
    }

    pub fn latest(&self) -> Option<&TopologySnapshot> {
        self.len.checked_sub(1).and_then(|i| self.slot(i))
    }

    pub fn oldest(&self) -> Option<&TopologySnapshot> {
        self.slot(0)
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TopologySnapshot> + '_ {
        (0..self.len).filter_map(move |i| self.slot(i))
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self {
            slots: vec![None; DEFAULT_HISTORY_CAPACITY],
            head: 0,
            len: 0,
        }
    }
}
