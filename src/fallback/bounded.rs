//! Capacity-bounded cache of parsed fallback files.
//!
//! Keyed by file name. Entries expire lazily after a TTL and are evicted
//! least-recently-used when the cache is full. Structural state (recency
//! order, membership) lives behind a mutex; the cached records themselves
//! are immutable `Arc`s, so readers share payloads without copying.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

use crate::record::TableRecord;

#[derive(Debug)]
struct Slot {
    record: Arc<TableRecord>,
    /// Unix timestamp of insertion, for TTL expiry.
    created_at: u64,
    /// Monotonic access sequence, for LRU ordering.
    last_used: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Slot>,
    seq: u64,
}

/// Bounded LRU+TTL cache for parsed [`TableRecord`]s.
#[derive(Debug)]
pub struct BoundedResultCache {
    inner: Mutex<Inner>,
    ttl_secs: u64,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl BoundedResultCache {
    /// Create a cache. `max_entries` is clamped to a minimum of 1 to
    /// keep the eviction loop from spinning.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl_secs: ttl.as_secs(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Look up a parsed record. Expired entries are removed and reported
    /// as misses; a hit refreshes the entry's recency.
    pub fn get(&self, key: &str) -> Option<Arc<TableRecord>> {
        let now = now_secs();
        let mut inner = self.lock();

        let expired = inner
            .entries
            .get(key)
            .map(|slot| now.saturating_sub(slot.created_at) > self.ttl_secs);
        match expired {
            Some(true) => {
                debug!(key, "Fallback cache entry expired");
                inner.entries.remove(key);
                self.expirations.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(false) => {
                inner.seq += 1;
                let seq = inner.seq;
                let slot = inner
                    .entries
                    .get_mut(key)
                    .map(|slot| {
                        slot.last_used = seq;
                        Arc::clone(&slot.record)
                    });
                self.hits.fetch_add(1, Ordering::Relaxed);
                slot
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a parsed record, evicting expired entries first and then
    /// the least-recently-used entries while at capacity.
    pub fn insert(&self, key: String, record: TableRecord) -> Arc<TableRecord> {
        let now = now_secs();
        let record = Arc::new(record);
        let mut inner = self.lock();

        let ttl = self.ttl_secs;
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, slot| now.saturating_sub(slot.created_at) <= ttl);
        let removed = before - inner.entries.len();
        if removed > 0 {
            self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
        }

        while inner.entries.len() >= self.max_entries && !inner.entries.contains_key(&key) {
            let lru = inner
                .entries
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(k, _)| k.clone());
            match lru {
                Some(lru_key) => {
                    debug!(key = %lru_key, "Evicting least-recently-used fallback entry");
                    inner.entries.remove(&lru_key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }

        inner.seq += 1;
        let seq = inner.seq;
        inner.entries.insert(
            key,
            Slot {
                record: Arc::clone(&record),
                created_at: now,
                last_used: seq,
            },
        );
        record
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Counters and configuration for the stats surface.
    pub fn stats(&self) -> BoundedCacheStats {
        BoundedCacheStats {
            entries: self.len(),
            capacity: self.max_entries,
            ttl_seconds: self.ttl_secs,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-update; the structural state
        // is still a valid map, so recover rather than cascade.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Point-in-time view of the bounded cache.
#[derive(Debug, Clone, Serialize)]
pub struct BoundedCacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub ttl_seconds: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
