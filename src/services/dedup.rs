// src/services/dedup.rs

//! Natural-key deduplication for one extraction run.

use std::collections::HashMap;
use std::hash::Hash;

/// Verdict for a record offered to a [`Deduper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First time this key was seen; keep the record.
    New,
    /// Same key, same content; drop it.
    Duplicate,
    /// Same key, different content; drop it but report it.
    Conflict,
}

/// Keeps the first record per key and flags later disagreeing copies.
#[derive(Debug)]
pub struct Deduper<K, V> {
    seen: HashMap<K, V>,
    duplicates: usize,
    conflicts: usize,
}

impl<K, V> Default for Deduper<K, V> {
    fn default() -> Self {
        Self {
            seen: HashMap::new(),
            duplicates: 0,
            conflicts: 0,
        }
    }
}

impl<K: Eq + Hash, V: PartialEq> Deduper<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a record. The first occurrence of a key is never overwritten.
    pub fn admit(&mut self, key: K, value: V) -> Admission {
        match self.seen.get(&key) {
            None => {
                self.seen.insert(key, value);
                Admission::New
            }
            Some(first) if *first == value => {
                self.duplicates += 1;
                Admission::Duplicate
            }
            Some(_) => {
                self.conflicts += 1;
                Admission::Conflict
            }
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains_key(key)
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins() {
        let mut dedup = Deduper::new();
        assert_eq!(dedup.admit(("A", "QB"), 74), Admission::New);
        assert_eq!(dedup.admit(("A", "QB"), 74), Admission::Duplicate);
        assert_eq!(dedup.admit(("A", "QB"), 75), Admission::Conflict);
        assert_eq!(dedup.admit(("B", "QB"), 75), Admission::New);
        assert_eq!(dedup.duplicates(), 1);
        assert_eq!(dedup.conflicts(), 1);
        assert!(dedup.contains(&("A", "QB")));
    }
}
