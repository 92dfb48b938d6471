//! Insertion-ordered deduplicating table.
//!
//! Entries live in a `Vec` arena; a digest of each entry's key maps to the
//! arena indices sharing that digest, and full key equality is checked on
//! every hit. Indices are stable, so they double as matrix row/column ids.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Something with an equality key.
pub trait Keyed {
    type Key: Hash + Eq;

    fn key(&self) -> &Self::Key;
}

impl Keyed for u64 {
    type Key = u64;

    fn key(&self) -> &u64 {
        self
    }
}

fn digest<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
pub struct RepTable<T: Keyed> {
    entries: Vec<T>,
    buckets: HashMap<u64, Vec<usize>>,
}

impl<T: Keyed> Default for RepTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> RepTable<T> {
    pub fn new() -> Self {
        RepTable {
            entries: Vec::new(),
            buckets: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        RepTable {
            entries: Vec::with_capacity(capacity),
            buckets: HashMap::with_capacity(capacity),
        }
    }

    /// Insert `item` unless an entry with an equal key exists.
    /// Returns true when the item was new.
    pub fn add(&mut self, item: T) -> bool {
        let d = digest(item.key());
        let bucket = self.buckets.entry(d).or_default();
        if bucket.iter().any(|&i| self.entries[i].key() == item.key()) {
            return false;
        }
        bucket.push(self.entries.len());
        self.entries.push(item);
        true
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Mutable access. Callers must not change the key.
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index)
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.index_of_key(item.key())
    }

    pub fn index_of_key(&self, key: &T::Key) -> Option<usize> {
        self.buckets
            .get(&digest(key))?
            .iter()
            .copied()
            .find(|&i| self.entries[i].key() == key)
    }

    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.index_of_key(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn keys(&self) -> &[T] {
        &self.entries
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Key collides on purpose: only the low bit is hashed.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Parity(u64);

    impl Hash for Parity {
        fn hash<H: Hasher>(&self, state: &mut H) {
            (self.0 & 1).hash(state);
        }
    }

    #[derive(Debug)]
    struct Item {
        key: Parity,
        label: &'static str,
    }

    impl Keyed for Item {
        type Key = Parity;

        fn key(&self) -> &Parity {
            &self.key
        }
    }

    #[test]
    fn test_add_and_lookup() {
        let mut table = RepTable::new();
        assert!(table.is_empty());
        assert!(table.add(5u64));
        assert!(table.add(3u64));
        assert!(!table.add(5u64));
        assert_eq!(table.len(), 2);
        assert_eq!(table.index_of(&3), Some(1));
        assert_eq!(table.index_of_key(&7), None);
        assert_eq!(table.get(0), Some(&5));
        assert_eq!(table.keys(), &[5u64, 3]);
    }

    #[test]
    fn test_collisions_resolved_by_equality() {
        let mut table = RepTable::with_capacity(4);
        for (k, label) in [(2, "a"), (4, "b"), (6, "c"), (4, "dup")] {
            table.add(Item {
                key: Parity(k),
                label,
            });
        }
        assert_eq!(table.len(), 3);
        assert_eq!(table.index_of_key(&Parity(6)), Some(2));
        assert_eq!(table.get(1).map(|i| i.label), Some("b"));
        assert!(!table.contains_key(&Parity(8)));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut table = RepTable::new();
        for p in [13u64, 2, 7, 2, 11, 13] {
            table.add(p);
        }
        let order: Vec<u64> = table.iter().copied().collect();
        assert_eq!(order, vec![13, 2, 7, 11]);
        assert_eq!(table.last(), Some(&11));
    }
}
