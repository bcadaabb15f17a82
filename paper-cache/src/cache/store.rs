//! Bounded cache store with TTL expiry and LRU eviction

use crate::cache::{
    clock::Clock,
    config::CacheConfig,
    entry::CacheEntry,
    key::CacheKey,
    types::{CacheCounters, CacheStats, TopEntry},
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Fingerprint-keyed store of cached values
///
/// All state (entries, recency order, counters) sits behind one `RwLock`.
/// Every operation that touches bookkeeping takes the write half, including
/// `get`, so invalidation and lookups are strictly ordered. No operation holds
/// the lock across an await point other than the acquisition itself.
pub struct CacheStore<V> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    inner: RwLock<StoreInner<V>>,
}

/// Internal cache storage
struct StoreInner<V> {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry<V>>,

    /// Recency order: tick -> key, oldest first
    recency: BTreeMap<u64, CacheKey>,

    /// Next recency tick to hand out
    next_tick: u64,

    /// Bumped by every clear and targeted invalidation
    generation: u64,

    counters: CacheCounters,
}

/// Outcome of a lookup, carrying the generation observed on a miss
pub(crate) enum Lookup<V> {
    Hit(V),
    Miss { generation: u64 },
}

impl<V> StoreInner<V> {
    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Move an entry to the most-recently-used position
    fn touch(&mut self, key: &CacheKey) {
        let tick = self.tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.metadata.recency);
            entry.metadata.recency = tick;
            self.recency.insert(tick, *key);
        }
    }

    fn remove_entry(&mut self, key: &CacheKey) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.metadata.recency);
        Some(entry)
    }

    fn evict_lru(&mut self) -> Option<CacheKey> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        self.counters.evictions += 1;
        Some(key)
    }

    fn insert(&mut self, mut entry: CacheEntry<V>, max_entries: usize) {
        let key = entry.key;

        if self.remove_entry(&key).is_some() {
            debug!("Replacing cache entry: {}", key.short());
        } else if self.entries.len() >= max_entries {
            if let Some(evicted) = self.evict_lru() {
                debug!("Evicted least recently used entry: {}", evicted.short());
            }
        }

        let tick = self.tick();
        entry.metadata.recency = tick;
        self.recency.insert(tick, key);
        self.entries.insert(key, entry);
    }
}

impl<V: Clone> CacheStore<V> {
    /// Create an empty store
    ///
    /// The configuration is expected to be validated by the caller.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            inner: RwLock::new(StoreInner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                next_tick: 0,
                generation: 0,
                counters: CacheCounters::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a value
    ///
    /// A hit bumps the entry's hit count and recency. An expired entry is
    /// removed and reported as a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        match self.lookup(key).await {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss { .. } => None,
        }
    }

    pub(crate) async fn lookup(&self, key: &CacheKey) -> Lookup<V> {
        let now = self.clock.now();
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired_at(now, self.config.ttl),
            None => {
                inner.counters.misses += 1;
                debug!("Cache miss: {}", key.short());
                return Lookup::Miss {
                    generation: inner.generation,
                };
            }
        };

        if expired {
            inner.remove_entry(key);
            inner.counters.misses += 1;
            inner.counters.expirations += 1;
            debug!("Cache entry expired: {}", key.short());
            return Lookup::Miss {
                generation: inner.generation,
            };
        }

        inner.touch(key);
        inner.counters.hits += 1;

        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.mark_accessed(now);
                debug!(
                    "Cache hit: {} (hits: {})",
                    key.short(),
                    entry.metadata.access_count
                );
                Lookup::Hit(entry.value.clone())
            }
            None => Lookup::Miss {
                generation: inner.generation,
            },
        }
    }

    /// Insert or replace a value, stamping its creation time now
    pub async fn put(&self, key: CacheKey, value: V) {
        let entry = CacheEntry::new(key, value, self.clock.now());
        let mut inner = self.inner.write().await;
        inner.insert(entry, self.config.max_entries);
    }

    /// Insert or replace a value, remembering the question for reporting
    pub async fn put_with_question(&self, key: CacheKey, value: V, question: &str) {
        let entry = CacheEntry::new(key, value, self.clock.now()).with_question(question);
        let mut inner = self.inner.write().await;
        inner.insert(entry, self.config.max_entries);
    }

    /// Insert only if no invalidation happened since `generation` was observed
    ///
    /// Returns whether the value was stored.
    pub(crate) async fn put_if_generation(
        &self,
        key: CacheKey,
        value: V,
        question: &str,
        generation: u64,
    ) -> bool {
        let entry = CacheEntry::new(key, value, self.clock.now()).with_question(question);
        let mut inner = self.inner.write().await;

        if inner.generation != generation {
            return false;
        }
        inner.insert(entry, self.config.max_entries);
        true
    }

    /// Check if a key is present, without touching hit bookkeeping
    pub async fn contains_key(&self, key: &CacheKey) -> bool {
        let inner = self.inner.read().await;
        inner.entries.contains_key(key)
    }

    /// Remove a specific entry from the store
    pub async fn remove(&self, key: &CacheKey) -> Option<V> {
        let mut inner = self.inner.write().await;
        let entry = inner.remove_entry(key)?;
        inner.counters.invalidations += 1;
        inner.generation += 1;

        debug!("Removed cache entry: {}", key.short());
        Some(entry.value)
    }

    /// Remove every entry; lifetime counters are kept
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;

        let count = inner.entries.len();
        inner.entries.clear();
        inner.recency.clear();
        inner.generation += 1;
        inner.counters.invalidations += count as u64;

        info!("Cleared {} entries from cache", count);
        count
    }

    /// Remove every entry whose value satisfies `predicate`
    pub async fn remove_matching<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&V) -> bool,
    {
        let mut inner = self.inner.write().await;

        let keys: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| predicate(&entry.value))
            .map(|(key, _)| *key)
            .collect();

        for key in &keys {
            inner.remove_entry(key);
        }
        inner.generation += 1;
        inner.counters.invalidations += keys.len() as u64;

        debug!("Removed {} matching entries", keys.len());
        keys.len()
    }

    /// Remove all expired entries
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let mut inner = self.inner.write().await;

        let expired: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now, ttl))
            .map(|(key, _)| *key)
            .collect();

        for key in &expired {
            inner.remove_entry(key);
        }
        inner.counters.expirations += expired.len() as u64;

        if !expired.is_empty() {
            debug!("Cleaned up {} expired entries", expired.len());
        }
        expired.len()
    }

    /// Get number of entries in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Lifetime counters
    pub async fn counters(&self) -> CacheCounters {
        self.inner.read().await.counters
    }

    /// Build a stats report; never mutates the store
    pub async fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let inner = self.inner.read().await;

        let mut ranked: Vec<&CacheEntry<V>> = inner.entries.values().collect();
        ranked.sort_by(|a, b| {
            b.metadata
                .access_count
                .cmp(&a.metadata.access_count)
                .then(b.metadata.accessed_at.cmp(&a.metadata.accessed_at))
                .then(b.metadata.recency.cmp(&a.metadata.recency))
        });

        let top_entries = ranked
            .into_iter()
            .take(self.config.top_entries)
            .map(|entry| TopEntry {
                key: entry.key.to_hex(),
                question: entry.metadata.question.clone(),
                hit_count: entry.metadata.access_count,
                created_at: entry.metadata.created_at,
                last_accessed_at: entry.metadata.accessed_at,
                ttl_remaining_seconds: entry
                    .time_until_expiration(now, ttl)
                    .map(|left| left.as_secs())
                    .unwrap_or(0),
            })
            .collect();

        CacheStats::from_counters(
            inner.counters,
            inner.entries.len(),
            self.config.max_entries,
            ttl.as_secs(),
            top_entries,
        )
    }
}
