//! A concurrent, byte-bounded LRU response cache.
//!
//! Keyed by the raw client request bytes (an exact-match fingerprint: two
//! requests only collide if they are byte-identical), this stands in for
//! the original design's singly-linked list of cache elements scanned
//! linearly for both lookup and eviction. A `HashMap` gives O(1) lookup and
//! a `BTreeMap` keyed by a strictly increasing logical clock gives O(log n)
//! eviction-candidate selection; externally the LRU ordering and byte caps
//! are identical.

use std::collections::{BTreeMap, HashMap};

use mea::mutex::Mutex;

use crate::limits::{CACHE_ENTRY_OVERHEAD, MAX_ELEMENT, MAX_TOTAL};

struct CacheEntry {
    method: String,
    payload: Vec<u8>,
    /// position in the recency index, so eviction can remove it in O(log n)
    /// without a second scan
    clock: u64,
}

impl CacheEntry {
    fn accounted_size(&self, key: &[u8]) -> usize {
        self.payload.len() + key.len() + self.method.len() + CACHE_ENTRY_OVERHEAD
    }
}

struct Inner {
    entries: HashMap<Vec<u8>, CacheEntry>,
    recency: BTreeMap<u64, Vec<u8>>,
    next_clock: u64,
    total_bytes: usize,
}

pub struct LruCache {
    inner: Mutex<Inner>,
}

impl LruCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                next_clock: 0,
                total_bytes: 0,
            }),
        }
    }

    /// Look up a cached response by its exact fingerprint and method. On a
    /// hit, stamps the entry as most-recently-used and returns a clone of
    /// its payload.
    pub async fn lookup(&self, fingerprint: &[u8], method: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().await;
        let clock = inner.next_clock;
        let matches = inner
            .entries
            .get(fingerprint)
            .is_some_and(|e| e.method == method);
        if !matches {
            return None;
        }

        let old_clock = inner.entries.get(fingerprint).unwrap().clock;
        inner.recency.remove(&old_clock);
        inner.next_clock += 1;
        inner.recency.insert(clock, fingerprint.to_vec());
        let entry = inner.entries.get_mut(fingerprint).unwrap();
        entry.clock = clock;
        Some(entry.payload.clone())
    }

    /// Insert a response payload under `fingerprint`/`method`, evicting the
    /// least-recently-used entries until the new entry fits under
    /// `MAX_TOTAL`. Returns `false` (without mutating anything) if the
    /// entry alone exceeds `MAX_ELEMENT`. This is advisory, never an error
    /// surfaced to the client.
    pub async fn insert(&self, payload: Vec<u8>, fingerprint: &[u8], method: &str) -> bool {
        let entry_size = payload.len() + fingerprint.len() + method.len() + CACHE_ENTRY_OVERHEAD;
        if entry_size > MAX_ELEMENT {
            return false;
        }

        let mut inner = self.inner.lock().await;

        while inner.total_bytes + entry_size > MAX_TOTAL {
            if !inner.evict_one() {
                break;
            }
        }

        if let Some(old) = inner.entries.remove(fingerprint) {
            inner.total_bytes -= old.accounted_size(fingerprint);
            inner.recency.remove(&old.clock);
        }

        let clock = inner.next_clock;
        inner.next_clock += 1;
        let entry = CacheEntry {
            method: method.to_string(),
            payload,
            clock,
        };
        inner.total_bytes += entry.accounted_size(fingerprint);
        inner.recency.insert(clock, fingerprint.to_vec());
        inner.entries.insert(fingerprint.to_vec(), entry);
        true
    }

    #[cfg(test)]
    async fn total_bytes(&self) -> usize {
        self.inner.lock().await.total_bytes
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}

impl Inner {
    /// Remove the entry with the smallest recency-clock value. Returns
    /// `false` if the cache is already empty.
    fn evict_one(&mut self) -> bool {
        let Some((&clock, key)) = self.recency.iter().next() else {
            return false;
        };
        let key = key.clone();
        self.recency.remove(&clock);
        if let Some(entry) = self.entries.remove(&key) {
            self.total_bytes -= entry.accounted_size(&key);
        }
        true
    }
}

impl Default for LruCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_on_unknown_key() {
        smol::block_on(async {
            let cache = LruCache::new();
            assert!(cache.lookup(b"nope", "GET").await.is_none());
        });
    }

    #[test]
    fn hit_after_insert_returns_same_payload() {
        smol::block_on(async {
            let cache = LruCache::new();
            assert!(cache.insert(b"payload-bytes".to_vec(), b"fp1", "GET").await);
            let hit = cache.lookup(b"fp1", "GET").await;
            assert_eq!(hit.as_deref(), Some(b"payload-bytes".as_slice()));
        });
    }

    #[test]
    fn method_mismatch_is_a_miss() {
        smol::block_on(async {
            let cache = LruCache::new();
            cache.insert(b"x".to_vec(), b"fp1", "GET").await;
            assert!(cache.lookup(b"fp1", "POST").await.is_none());
        });
    }

    #[test]
    fn oversized_entry_is_rejected_without_mutating_state() {
        smol::block_on(async {
            let cache = LruCache::new();
            let huge = vec![0u8; MAX_ELEMENT + 1];
            assert!(!cache.insert(huge, b"fp1", "GET").await);
            assert_eq!(cache.total_bytes().await, 0);
            assert_eq!(cache.len().await, 0);
        });
    }

    #[test]
    fn total_bytes_respects_cap_and_evicts_lru_first() {
        smol::block_on(async {
            let cache = LruCache::new();
            let entry_size = MAX_ELEMENT / 2;
            let count = MAX_TOTAL / entry_size + 2;

            let mut keys = Vec::new();
            for i in 0..count {
                let key = format!("key-{i}").into_bytes();
                cache
                    .insert(vec![0u8; entry_size - key.len() - 3 - CACHE_ENTRY_OVERHEAD], &key, "GET")
                    .await;
                keys.push(key);
            }

            assert!(cache.total_bytes().await <= MAX_TOTAL);
            // the earliest key, never re-looked-up, should have been evicted first
            assert!(cache.lookup(&keys[0], "GET").await.is_none());
        });
    }
}
