//! # Query Answer Cache
//!
//! Caches generated answers to research questions so repeated questions skip
//! the embed → search → generate pipeline.
//!
//! ## Features
//!
//! - **Normalized Keys**: case, whitespace and filter order do not change the fingerprint
//! - **TTL-Based Expiration**: measured from creation, never extended by hits
//! - **LRU Eviction**: bounded entry count, least recently accessed goes first
//! - **Invalidation Hooks**: full clear on upload, targeted removal on delete
//! - **Stats**: hit rate, eviction counts and the most reused entries
//!
//! ## Example
//!
//! ```rust
//! use paper_cache::cache::{CacheConfig, CachedAnswer, QueryCache};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::builder()
//!     .ttl(Duration::from_secs(3600)) // 1 hour
//!     .max_entries(1_000)
//!     .build();
//!
//! let cache: QueryCache = QueryCache::new(config)?;
//!
//! let (answer, cached) = cache
//!     .get_or_compute("What is attention?", 5, None, || async {
//!         Ok::<_, anyhow::Error>(CachedAnswer::new("A weighted sum over values."))
//!     })
//!     .await?;
//! assert!(!cached);
//!
//! // A paper was deleted; drop every answer that cited it
//! cache.invalidate_document(3).await;
//! # let _ = answer;
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod clock;
pub mod config;
pub mod entry;
pub mod invalidation;
pub mod key;
pub mod orchestrator;
pub mod store;
pub mod types;

pub use answer::{CachedAnswer, Citation};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::{CacheEntry, CacheMetadata};
pub use invalidation::{InvalidationEvent, InvalidationReason, SourceDocuments};
pub use key::{normalize, normalize_question, CacheKey};
pub use orchestrator::{spawn_auto_cleanup, QueryCache};
pub use store::CacheStore;
pub use types::{CacheCounters, CacheStats, DocumentId, TopEntry};
