//! The get-or-compute contract
//!
//! [`QueryCache`] is what the rest of the service talks to. It fingerprints a
//! query, serves a valid cached value when there is one, and otherwise runs the
//! caller's computation and stores its result.
//!
//! Concurrent identical misses are not deduplicated: two callers missing on
//! the same key at the same time both run their computation, and the later
//! `put` replaces the earlier one as a whole entry. A result computed across an
//! invalidation is returned to its caller but never stored.

use crate::cache::{
    answer::CachedAnswer,
    clock::{Clock, SystemClock},
    config::CacheConfig,
    key::normalize,
    store::{CacheStore, Lookup},
    types::{CacheStats, DocumentId},
};
use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Query cache shared by every request path
///
/// Construct one at startup and share it behind an `Arc`. When the
/// configuration disables caching, no store is allocated and
/// [`get_or_compute`](Self::get_or_compute) always runs the computation.
pub struct QueryCache<V = CachedAnswer> {
    config: CacheConfig,
    store: Option<CacheStore<V>>,
}

impl<V: Clone + Send + Sync> QueryCache<V> {
    /// Create a cache using the wall clock
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with a custom time source
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let store = if config.enabled {
            info!(
                "Initializing query cache (ttl: {}s, max entries: {})",
                config.ttl.as_secs(),
                config.max_entries
            );
            Some(CacheStore::new(config.clone(), clock))
        } else {
            info!("Query cache disabled, answers will always be computed");
            None
        };

        Ok(Self { config, store })
    }

    /// A passthrough cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            config: CacheConfig::disabled(),
            store: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Direct access to the underlying store, absent when disabled
    pub fn store(&self) -> Option<&CacheStore<V>> {
        self.store.as_ref()
    }

    /// Return the cached value for a query, or compute and cache it
    ///
    /// The boolean is `true` when the value came from the cache. `compute` is
    /// not invoked on a hit, and runs with no lock held on a miss. If it fails,
    /// its error is returned unchanged and nothing is stored, so the next
    /// identical request computes again. Dropping the returned future before it
    /// completes also stores nothing.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        question: &str,
        top_k: usize,
        paper_ids: Option<&[DocumentId]>,
        compute: F,
    ) -> std::result::Result<(V, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        let Some(store) = &self.store else {
            let value = compute().await?;
            return Ok((value, false));
        };

        let key = normalize(question, top_k, paper_ids);
        let generation = match store.lookup(&key).await {
            Lookup::Hit(value) => return Ok((value, true)),
            Lookup::Miss { generation } => generation,
        };

        let value = compute().await?;

        if store
            .put_if_generation(key, value.clone(), question, generation)
            .await
        {
            debug!("Cached answer: {}", key.short());
        } else {
            warn!(
                "Not caching answer for {}: cache was invalidated while it was computed",
                key.short()
            );
        }

        Ok((value, false))
    }

    /// Look up a query without computing anything on a miss
    pub async fn get(
        &self,
        question: &str,
        top_k: usize,
        paper_ids: Option<&[DocumentId]>,
    ) -> Option<V> {
        let store = self.store.as_ref()?;
        store.get(&normalize(question, top_k, paper_ids)).await
    }

    /// Administrative flush; returns how many entries were dropped
    pub async fn clear(&self) -> usize {
        match &self.store {
            Some(store) => store.clear().await,
            None => 0,
        }
    }

    /// Sweep expired entries; returns how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        match &self.store {
            Some(store) => store.cleanup_expired().await,
            None => 0,
        }
    }

    /// Current number of cached entries
    pub async fn len(&self) -> usize {
        match &self.store {
            Some(store) => store.len().await,
            None => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Read-only occupancy and traffic report
    pub async fn stats(&self) -> CacheStats {
        match &self.store {
            Some(store) => store.stats().await,
            None => CacheStats::disabled(self.config.max_entries, self.config.ttl.as_secs()),
        }
    }
}

/// Start the background sweep of expired entries
///
/// Returns `None` when caching or auto cleanup is turned off.
pub fn spawn_auto_cleanup<V>(cache: Arc<QueryCache<V>>) -> Option<JoinHandle<()>>
where
    V: Clone + Send + Sync + 'static,
{
    if !cache.is_enabled() || !cache.config.enable_auto_cleanup {
        return None;
    }

    let interval = cache.config.cleanup_interval;
    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    Some(tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                debug!("Auto cleanup removed {} expired entries", removed);
            }
        }
    }))
}
