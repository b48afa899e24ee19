//! Shared collection abstractions used by the resolution caches.
//!
//! The default build uses `dashmap::DashMap` for concurrency.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct ConcurrentMap<K, V> {
    inner: DashMap<K, V>,
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key).map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    pub fn get_or_insert_with(&self, key: K, init: impl FnOnce() -> V) -> V
    where
        V: Clone,
    {
        self.inner.entry(key).or_insert_with(init).value().clone()
    }

    pub fn retain(&self, f: impl FnMut(&K, &mut V) -> bool) {
        self.inner.retain(f);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for entry in self.inner.iter() {
            let (k, v) = entry.pair();
            f(k, v);
        }
    }
}

struct Stamped<V> {
    value: V,
    touched: AtomicU64,
}

/// A concurrent map with an upper bound on its entry count.
///
/// Every read or write stamps the entry with a logical clock. Inserting into a
/// full cache evicts the least recently stamped quarter of the entries.
/// Concurrent writers may overshoot the bound by a few entries before the next
/// eviction catches up.
pub struct BoundedCache<K, V> {
    inner: DashMap<K, Stamped<V>>,
    capacity: usize,
    clock: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: DashMap::new(),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.inner.get(key)?;
        entry.touched.store(self.tick(), Ordering::Relaxed);
        Some(entry.value.clone())
    }

    /// Last writer wins.
    pub fn insert(&self, key: K, value: V) {
        if !self.inner.contains_key(&key) && self.inner.len() >= self.capacity {
            self.evict_oldest();
        }
        let stamped = Stamped {
            value,
            touched: AtomicU64::new(self.tick()),
        };
        self.inner.insert(key, stamped);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key).map(|(_, stamped)| stamped.value)
    }

    /// Keeps only the entries for which `keep` returns true, returns how many were dropped.
    pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) -> usize {
        let before = self.inner.len();
        self.inner.retain(|key, stamped| keep(key, &stamped.value));
        before.saturating_sub(self.inner.len())
    }

    fn evict_oldest(&self) {
        let mut stamps: Vec<(u64, K)> = self
            .inner
            .iter()
            .map(|entry| {
                (
                    entry.value().touched.load(Ordering::Relaxed),
                    entry.key().clone(),
                )
            })
            .collect();
        stamps.sort_unstable_by_key(|(stamp, _)| *stamp);
        let count = (self.capacity / 4).max(1);
        for (_, key) in stamps.into_iter().take(count) {
            if self.inner.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        tracing::debug!(evicted = count, capacity = self.capacity, "bounded cache eviction");
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}
