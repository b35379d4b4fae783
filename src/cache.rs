//! Bounded in-memory caches for extracted content and computed answers.
//!
//! [`BoundedCache`] owns its synchronization; callers never see the map or
//! its lock. `lookup` never computes; a miss is terminal and the caller
//! decides what to do. `store` overwrites unconditionally, so the cache holds
//! at most one entry per key. When full, the oldest entry is evicted; an
//! optional TTL additionally turns stale entries into misses.
//!
//! [`memoized`] composes a key with a compute function into a read-through
//! lookup. Two concurrent callers computing the same key may both run the
//! computation; the second store wins, which is acceptable because entries
//! are pure functions of their key.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;

struct Slot<V> {
    value: V,
    stored_at: Instant,
    sequence: u64,
}

/// A capacity-bounded, internally synchronized key/value cache.
pub struct BoundedCache<V> {
    inner: Mutex<CacheState<V>>,
    capacity: usize,
    ttl: Option<Duration>,
}

struct CacheState<V> {
    map: HashMap<String, Slot<V>>,
    next_sequence: u64,
}

impl<V: Clone> BoundedCache<V> {
    /// Creates a cache holding up to `capacity` entries, with entries
    /// older than `ttl` reported as misses when one is given.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(CacheState {
                map: HashMap::new(),
                next_sequence: 0,
            }),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Returns the cached value for `key`, or `None`. Never computes.
    pub fn lookup(&self, key: &str) -> Option<V> {
        let mut state = self.lock();
        let expired = match state.map.get(key) {
            Some(slot) => self
                .ttl
                .is_some_and(|ttl| slot.stored_at.elapsed() > ttl),
            None => return None,
        };
        if expired {
            state.map.remove(key);
            return None;
        }
        state.map.get(key).map(|slot| slot.value.clone())
    }

    /// Inserts `value` under `key`, overwriting any existing entry. At
    /// capacity, the oldest entry is evicted first.
    pub fn store(&self, key: &str, value: V) {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        if !state.map.contains_key(key) && state.map.len() >= self.capacity {
            if let Some(oldest) = state
                .map
                .iter()
                .min_by_key(|(_, slot)| slot.sequence)
                .map(|(k, _)| k.clone())
            {
                state.map.remove(&oldest);
            }
        }

        state.map.insert(
            key.to_string(),
            Slot {
                value,
                stored_at: Instant::now(),
                sequence,
            },
        );
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops the entry for `key`, forcing the next access to recompute.
    pub fn invalidate(&self, key: &str) {
        self.lock().map.remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState<V>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Read-through composition: returns the cached value for `key`, or runs
/// `compute`, stores its result, and returns it. Errors are not cached.
pub async fn memoized<V, F, Fut>(cache: &BoundedCache<V>, key: &str, compute: F) -> Result<V>
where
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V>>,
{
    if let Some(hit) = cache.lookup(key) {
        return Ok(hit);
    }
    let value = compute().await?;
    cache.store(key, value.clone());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn store_then_lookup_round_trips() {
        let cache: BoundedCache<String> = BoundedCache::new(4, None);
        cache.store("k", "v".to_string());
        assert_eq!(cache.lookup("k").as_deref(), Some("v"));
    }

    #[test]
    fn lookup_on_unseen_key_misses() {
        let cache: BoundedCache<String> = BoundedCache::new(4, None);
        assert!(cache.lookup("missing").is_none());
    }

    #[test]
    fn store_overwrites_existing_entry() {
        let cache: BoundedCache<i64> = BoundedCache::new(4, None);
        cache.store("k", 1);
        cache.store("k", 2);
        assert_eq!(cache.lookup("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest_entry() {
        let cache: BoundedCache<i64> = BoundedCache::new(2, None);
        cache.store("a", 1);
        cache.store("b", 2);
        cache.store("c", 3);
        assert!(cache.lookup("a").is_none());
        assert_eq!(cache.lookup("b"), Some(2));
        assert_eq!(cache.lookup("c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn overwriting_at_capacity_does_not_evict() {
        let cache: BoundedCache<i64> = BoundedCache::new(2, None);
        cache.store("a", 1);
        cache.store("b", 2);
        cache.store("a", 10);
        assert_eq!(cache.lookup("a"), Some(10));
        assert_eq!(cache.lookup("b"), Some(2));
    }

    #[test]
    fn expired_entries_report_as_misses() {
        let cache: BoundedCache<i64> = BoundedCache::new(4, Some(Duration::from_millis(0)));
        cache.store("k", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.lookup("k").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn invalidate_forces_miss() {
        let cache: BoundedCache<i64> = BoundedCache::new(4, None);
        cache.store("k", 1);
        cache.invalidate("k");
        assert!(cache.lookup("k").is_none());
    }

    #[tokio::test]
    async fn memoized_computes_once_per_key() {
        let cache: BoundedCache<String> = BoundedCache::new(4, None);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = memoized(&cache, "k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("computed".to_string())
            })
            .await
            .unwrap();
            assert_eq!(value, "computed");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn memoized_does_not_cache_errors() {
        let cache: BoundedCache<String> = BoundedCache::new(4, None);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = memoized(&cache, "k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                bail!("extraction failed")
            })
            .await;
            assert!(result.is_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }
}
