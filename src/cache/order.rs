//! Insertion Order Module
//!
//! Tracks the order keys were inserted in, oldest first.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// == Insertion Order ==
/// Tracks insertion order for ordered iteration.
///
/// Every key holds a sequence number; a smaller number means an older key.
/// Re-inserting a key after removing it gives it a fresh, larger number.
#[derive(Debug)]
pub(crate) struct InsertionOrder<K> {
    /// Key to sequence number
    seqs: HashMap<K, u64>,
    /// Sequence number to key, oldest first
    order: BTreeMap<u64, K>,
    /// Next sequence number to hand out
    next_seq: u64,
}

impl<K> Default for InsertionOrder<K> {
    fn default() -> Self {
        Self {
            seqs: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Eq + Hash + Clone> InsertionOrder<K> {
    // == Push ==
    /// Appends a key as the newest, unless it is already tracked.
    ///
    /// Returns `false` when the key was already tracked; its position is
    /// left unchanged.
    pub fn push(&mut self, key: &K) -> bool {
        if self.seqs.contains_key(key) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.seqs.insert(key.clone(), seq);
        self.order.insert(seq, key.clone());
        true
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.seqs.remove(key) {
            Some(seq) => {
                self.order.remove(&seq);
                true
            }
            None => false,
        }
    }

    // == Iter ==
    /// Iterates keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.values()
    }
}
