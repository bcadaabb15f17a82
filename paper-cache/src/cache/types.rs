//! Core type definitions for the cache system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a paper in the library
pub type DocumentId = u64;

/// Lifetime counters kept by the store
///
/// These survive `clear()`; they describe cache traffic, not occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped by LRU to make room
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Entries dropped by clears and targeted invalidation
    pub invalidations: u64,
}

impl CacheCounters {
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups that hit, `0.0` before any lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// One of the most reused entries in a stats report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopEntry {
    /// Hex fingerprint
    pub key: String,

    /// Question as originally asked, truncated for display
    pub question: Option<String>,

    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,

    /// Seconds left before the entry expires
    pub ttl_remaining_seconds: u64,
}

/// Point-in-time report of cache occupancy and traffic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub invalidations: u64,
    pub hit_rate: f64,
    pub ttl_seconds: u64,
    pub top_entries: Vec<TopEntry>,
}

impl CacheStats {
    pub(crate) fn from_counters(
        counters: CacheCounters,
        size: usize,
        max_size: usize,
        ttl_seconds: u64,
        top_entries: Vec<TopEntry>,
    ) -> Self {
        Self {
            enabled: true,
            size,
            max_size,
            hits: counters.hits,
            misses: counters.misses,
            total_requests: counters.total_requests(),
            evictions: counters.evictions,
            expirations: counters.expirations,
            invalidations: counters.invalidations,
            hit_rate: counters.hit_rate(),
            ttl_seconds,
            top_entries,
        }
    }

    /// Report for a cache constructed with caching turned off
    pub fn disabled(max_size: usize, ttl_seconds: u64) -> Self {
        Self {
            enabled: false,
            size: 0,
            max_size,
            hits: 0,
            misses: 0,
            total_requests: 0,
            evictions: 0,
            expirations: 0,
            invalidations: 0,
            hit_rate: 0.0,
            ttl_seconds,
            top_entries: Vec::new(),
        }
    }

    pub fn hit_rate_percent(&self) -> f64 {
        self.hit_rate * 100.0
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ size: {}/{}, hits: {}, misses: {}, hit_rate: {:.2}%, evictions: {}, expirations: {} }}",
            self.size,
            self.max_size,
            self.hits,
            self.misses,
            self.hit_rate_percent(),
            self.evictions,
            self.expirations
        )
    }
}
