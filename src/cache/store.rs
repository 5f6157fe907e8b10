//! Ordered Store Module
//!
//! The container contract the scheduler drives, and a HashMap-backed
//! implementation that iterates in insertion order.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::InsertionOrder;

// == Ordered Map Contract ==
/// A unique-keyed container iterated in insertion order.
///
/// Updating an existing key through [`OrderedMap::insert`] keeps its
/// position; removing and re-inserting moves it to the back.
pub trait OrderedMap<K, V>: Send + 'static {
    /// Inserts or updates a key, returning the previous value.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// Removes a key, returning its value.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Checks whether a key is present.
    fn contains_key(&self, key: &K) -> bool;

    /// Looks up the value stored for a key.
    fn get(&self, key: &K) -> Option<&V>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Iterates entries from the oldest insertion to the newest.
    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Ordered Store ==
/// HashMap storage with an insertion-order tracker.
#[derive(Debug)]
pub struct OrderedStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, V>,
    /// Insertion order of the stored keys
    order: InsertionOrder<K>,
}

impl<K, V> Default for OrderedStore<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::default(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> OrderedStore<K, V> {
    // == Constructor ==
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V> OrderedMap<K, V> for OrderedStore<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.order.push(&key);
        self.entries.insert(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key)?;
        self.order.remove(key);
        Some(removed)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(
            self.order
                .iter()
                .filter_map(move |key| self.entries.get_key_value(key)),
        )
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for OrderedStore<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.order.push(&key);
            store.entries.insert(key, value);
        }
        store
    }
}
