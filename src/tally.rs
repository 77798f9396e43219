//! Insertion-ordered counting.
//!
//! Every "most common" question in the crate goes through [`Tally`], so ties
//! always resolve to whichever key was seen first while scanning the input.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq)]
pub struct Entry<K, V> {
    pub key: K,
    pub count: u64,
    /// Captured from the first occurrence of `key`.
    pub value: V,
}

#[derive(Debug, Clone)]
pub struct Tally<K, V = ()> {
    slots: HashMap<K, usize>,
    entries: Vec<Entry<K, V>>,
}

impl<K, V> Default for Tally<K, V> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K, V> Tally<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of `key`. `init` only runs the first time the key
    /// shows up.
    pub fn record(&mut self, key: K, init: impl FnOnce() -> V) -> &mut Entry<K, V> {
        let index = match self.slots.get(&key) {
            Some(index) => *index,
            None => {
                let index = self.entries.len();
                self.slots.insert(key.clone(), index);
                self.entries.push(Entry {
                    key,
                    count: 0,
                    value: init(),
                });
                index
            }
        };
        let entry = &mut self.entries[index];
        entry.count = entry.count.saturating_add(1);
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest count, earliest first-seen on ties.
    pub fn leader(&self) -> Option<&Entry<K, V>> {
        let mut best: Option<&Entry<K, V>> = None;
        for entry in &self.entries {
            if best.is_none_or(|current| entry.count > current.count) {
                best = Some(entry);
            }
        }
        best
    }

    /// All entries by count descending. The sort is stable, so equal counts
    /// keep first-seen order.
    pub fn ranked(self) -> Vec<Entry<K, V>> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries
    }
}

impl<K> Tally<K, ()>
where
    K: Hash + Eq + Clone,
{
    pub fn add(&mut self, key: K) {
        self.record(key, || ());
    }
}

impl<K> FromIterator<K> for Tally<K, ()>
where
    K: Hash + Eq + Clone,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tally = Self::new();
        for key in iter {
            tally.add(key);
        }
        tally
    }
}
