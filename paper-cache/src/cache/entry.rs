//! Cache entry management with TTL support

use crate::cache::key::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest question prefix kept for stats display
pub const QUESTION_PREVIEW_CHARS: usize = 100;

/// A cached value plus the bookkeeping the store needs for TTL and LRU
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cache key
    pub key: CacheKey,

    /// The cached value, never inspected by the store
    pub value: V,

    /// Entry metadata
    pub metadata: CacheMetadata,
}

impl<V> CacheEntry<V> {
    /// Create a new entry stamped at `now`
    pub fn new(key: CacheKey, value: V, now: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            metadata: CacheMetadata {
                created_at: now,
                accessed_at: now,
                access_count: 0,
                question: None,
                recency: 0,
            },
        }
    }

    /// Remember the question that produced this entry, for reporting
    pub fn with_question(mut self, question: &str) -> Self {
        self.metadata.question = Some(question.chars().take(QUESTION_PREVIEW_CHARS).collect());
        self
    }

    /// Expiry is measured from creation; hits never extend it
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) >= ttl
    }

    /// Time left before expiry, `None` once expired
    pub fn time_until_expiration(&self, now: DateTime<Utc>, ttl: Duration) -> Option<Duration> {
        ttl.checked_sub(self.age_at(now)).filter(|left| !left.is_zero())
    }

    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.metadata.created_at
            + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero())
    }

    /// Record a successful retrieval
    pub fn mark_accessed(&mut self, now: DateTime<Utc>) {
        self.metadata.accessed_at = now;
        self.metadata.access_count += 1;
    }

    /// Age of the entry; a clock that moved backwards reads as zero
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.metadata.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the entry was created
    pub created_at: DateTime<Utc>,

    /// Last access time (creation counts as an access)
    pub accessed_at: DateTime<Utc>,

    /// Number of successful retrievals
    pub access_count: u64,

    /// Truncated original question
    pub question: Option<String>,

    /// Position in the store's recency order; larger is more recent
    #[serde(skip)]
    pub(crate) recency: u64,
}
