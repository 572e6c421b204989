//! TopN — bounded "largest N by count" ranking.
//!
//! An indexed binary min-heap keeps the current N largest entries with the
//! smallest at the root; a key → slot map makes count updates for tracked
//! keys O(log N) instead of a linear search.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

/// One ranked key with its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntity<K> {
    pub key: K,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct TopNSelector<K> {
    capacity: usize,
    heap: Vec<RankedEntity<K>>,
    slots: HashMap<K, usize>,
}

impl<K: Hash + Eq + Clone> TopNSelector<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    /// Offer `key` with its current `count`.
    ///
    /// A tracked key has its count replaced. An untracked key is inserted
    /// while there is room; once full it displaces the minimum only when
    /// its count is strictly greater.
    pub fn update(&mut self, key: K, count: u64) {
        if self.capacity == 0 {
            return;
        }

        if let Some(&slot) = self.slots.get(&key) {
            self.heap[slot].count = count;
            self.sift_up(slot);
            let slot = self.slots.get(&key).copied().unwrap_or(slot);
            self.sift_down(slot);
            return;
        }

        if self.heap.len() < self.capacity {
            let slot = self.heap.len();
            self.slots.insert(key.clone(), slot);
            self.heap.push(RankedEntity { key, count });
            self.sift_up(slot);
            return;
        }

        if count > self.heap[0].count {
            let evicted = std::mem::replace(&mut self.heap[0], RankedEntity { key: key.clone(), count });
            self.slots.remove(&evicted.key);
            self.slots.insert(key, 0);
            self.sift_down(0);
        }
    }

    /// Tracked entries, largest count first. Equal counts keep their heap
    /// order, so repeated calls on the same selector agree.
    pub fn results(&self) -> Vec<RankedEntity<K>> {
        let mut out = self.heap.clone();
        out.sort_by(|a, b| b.count.cmp(&a.count));
        out
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.slots.clear();
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap[slot].count >= self.heap[parent].count {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;

            if left < len && self.heap[left].count < self.heap[smallest].count {
                smallest = left;
            }
            if right < len && self.heap[right].count < self.heap[smallest].count {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        if let Some(s) = self.slots.get_mut(&self.heap[a].key) {
            *s = a;
        }
        if let Some(s) = self.slots.get_mut(&self.heap[b].key) {
            *s = b;
        }
    }
}
