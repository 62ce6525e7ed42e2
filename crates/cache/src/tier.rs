//! A single cache tier: moka with LRU eviction, an absolute TTL and counters.

use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Capacity and lifetime of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Maximum number of entries. Zero disables the tier.
    pub capacity: u64,
    /// Time after insertion at which an entry expires, however often it is
    /// read.
    pub ttl: Duration,
}

/// A cached value with its bookkeeping timestamps.
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted: Instant,
    /// Milliseconds between `inserted` and the most recent read.
    last_access: Arc<AtomicU64>,
}

impl<V> Entry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            inserted: Instant::now(),
            last_access: Arc::new(AtomicU64::new(0)),
        }
    }

    fn touch(&self) {
        let since_insert = u64::try_from(self.inserted.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_access.store(since_insert, Ordering::Relaxed);
    }

    fn idle(&self) -> Duration {
        self.inserted.elapsed().saturating_sub(Duration::from_millis(self.last_access.load(Ordering::Relaxed)))
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time statistics for one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Approximate number of live entries.
    pub size: u64,
    pub capacity: u64,
}

/// One LRU+TTL cache tier.
///
/// Reads refresh recency (what LRU eviction looks at) but never the TTL
/// deadline. Every removal other than an overwrite is counted and logged as a
/// disposal.
#[derive(Clone)]
pub struct Tier<K, V> {
    name: &'static str,
    settings: Settings,
    inner: Cache<K, Entry<V>>,
    counters: Arc<Counters>,
}

impl<K, V> Tier<K, V>
where
    K: Hash + Eq + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, settings: Settings) -> Self {
        let counters = Arc::new(Counters::default());
        let listener_counters = Arc::clone(&counters);
        let inner = Cache::builder()
            .name(name)
            .max_capacity(settings.capacity)
            .time_to_live(settings.ttl)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |key: Arc<K>, entry: Entry<V>, cause: RemovalCause| {
                if cause == RemovalCause::Replaced {
                    return;
                }
                listener_counters.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    tier = name,
                    key = ?key,
                    ?cause,
                    age_ms = entry.inserted.elapsed().as_millis(),
                    idle_ms = entry.idle().as_millis(),
                    "Disposed cache entry"
                );
            })
            .build();
        Self {
            name,
            settings,
            inner,
            counters,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `false` when configured with zero capacity; nothing is ever retained.
    pub fn is_enabled(&self) -> bool {
        self.settings.capacity > 0
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        match self.inner.get(key).await {
            Some(entry) => {
                entry.touch();
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value)
            },
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Stores a value, replacing any previous one under the same key.
    pub async fn set(&self, key: K, value: V) {
        if self.is_enabled() {
            self.inner.insert(key, Entry::new(value)).await;
        }
    }

    /// Removes one entry, returning its value if it was present.
    pub async fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key).await.map(|entry| entry.value)
    }

    /// Removes one entry, returning whether it was present.
    pub async fn delete(&self, key: &K) -> bool {
        self.remove(key).await.is_some()
    }

    /// Removes every entry whose key matches, returning the removed values.
    pub async fn delete_where(&self, mut predicate: impl FnMut(&K) -> bool) -> Vec<V> {
        let keys: Vec<Arc<K>> = self.inner.iter().filter(|(key, _)| predicate(key.as_ref())).map(|(key, _)| key).collect();
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.inner.remove(key.as_ref()).await {
                removed.push(entry.value);
            }
        }
        removed
    }

    /// Drops every entry and resets the counters.
    pub async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        self.counters.reset();
    }

    /// Runs moka's deferred maintenance (expiry, capacity eviction and
    /// disposal notifications) now rather than on a later access.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }

    pub fn stats(&self) -> TierStats {
        TierStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            size: self.inner.entry_count(),
            capacity: self.settings.capacity,
        }
    }
}
