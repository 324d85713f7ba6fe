//! Ordered cache of rows pulled from a provider sequence.

use ahash::AHashMap;
use dataview_core::{Key, Value};

/// Rows fetched so far by one `fetch_first` sequence, in sequence order.
///
/// Entries are contiguous from logical index 0 under the sequence's sort and
/// filter. `done` records that the provider sequence is exhausted, so the
/// cache holds every remaining row.
#[derive(Debug, Default)]
pub struct OffsetCache {
    keys: Vec<Key>,
    data: Vec<Value>,
    positions: AHashMap<Key, usize>,
    done: bool,
}

impl OffsetCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one mapped page. `keys` and `data` must be parallel.
    pub fn append(&mut self, keys: Vec<Key>, data: Vec<Value>) {
        debug_assert_eq!(keys.len(), data.len());
        let base = self.keys.len();
        for (offset, key) in keys.iter().enumerate() {
            self.positions.entry(key.clone()).or_insert(base + offset);
        }
        self.keys.extend(keys);
        self.data.extend(data);
    }

    /// Index of the first entry with `key`.
    #[must_use]
    pub fn index_of(&self, key: &Key) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Drops every entry before `index`, so the entry at `index` becomes
    /// logical index 0.
    pub fn discard_before(&mut self, index: usize) {
        let index = index.min(self.keys.len());
        if index == 0 {
            return;
        }
        self.keys.drain(..index);
        self.data.drain(..index);
        self.positions.clear();
        for (i, key) in self.keys.iter().enumerate() {
            self.positions.entry(key.clone()).or_insert(i);
        }
    }

    /// Copies up to `len` entries starting at `start`.
    #[must_use]
    pub fn slice(&self, start: usize, len: usize) -> (Vec<Key>, Vec<Value>) {
        let start = start.min(self.keys.len());
        let end = start.saturating_add(len).min(self.keys.len());
        (self.keys[start..end].to_vec(), self.data[start..end].to_vec())
    }

    /// Number of entries at or after `start`.
    #[must_use]
    pub fn available_from(&self, start: usize) -> usize {
        self.keys.len().saturating_sub(start)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Removes every entry. The done flag is kept.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.data.clear();
        self.positions.clear();
    }

    pub fn mark_done(&mut self) {
        self.done = true;
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }
}
