use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Instant;

/// A set of one-shot deadlines, at most one per key.
///
/// Scheduling an existing key replaces its deadline. Entries with the same
/// deadline fire in the order they were scheduled.
#[derive(Debug)]
pub struct TimerQueue<K> {
    by_deadline: BTreeMap<(Instant, u64), K>,
    by_key: HashMap<K, (Instant, u64)>,
    seq: u64,
}

impl<K: Clone + Eq + Hash> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            by_deadline: BTreeMap::new(),
            by_key: HashMap::new(),
            seq: 0,
        }
    }

    /// Arms `key` to fire at `at`. Returns `true` if an earlier deadline for
    /// the same key was replaced.
    pub fn schedule(&mut self, key: K, at: Instant) -> bool {
        let replaced = self.cancel(&key);
        self.seq += 1;
        let slot = (at, self.seq);
        self.by_deadline.insert(slot, key.clone());
        self.by_key.insert(key, slot);
        replaced
    }

    /// Disarms `key`. Returns `true` if it was pending.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.by_key.remove(key) {
            Some(slot) => {
                self.by_deadline.remove(&slot);
                true
            }
            None => false,
        }
    }

    /// Disarms every key matching `predicate`, returning how many were
    /// removed.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let doomed: Vec<K> = self
            .by_key
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        for key in &doomed {
            self.cancel(key);
        }
        doomed.len()
    }

    /// Whether `key` is currently armed.
    pub fn contains(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.by_deadline.keys().next().map(|(at, _)| *at)
    }

    /// Removes and returns the earliest entry whose deadline is `<= now`,
    /// together with the deadline it was scheduled for.
    pub fn pop_due(&mut self, now: Instant) -> Option<(K, Instant)> {
        let (&slot, _) = self.by_deadline.iter().next()?;
        if slot.0 > now {
            return None;
        }
        let key = self.by_deadline.remove(&slot)?;
        self.by_key.remove(&key);
        Some((key, slot.0))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl<K: Clone + Eq + Hash> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
