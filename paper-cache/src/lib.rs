//! # paper-cache
//!
//! In-memory query cache for the research paper QA service.
//!
//! Answering a question means embedding it, searching the vector store and
//! calling a language model. This crate sits in front of that pipeline:
//!
//! - [`normalize`] turns `(question, top_k, paper filter)` into a [`CacheKey`]
//! - [`CacheStore`] holds at most `max_entries` answers, expiring them by TTL
//!   and evicting the least recently used one when full
//! - [`QueryCache::get_or_compute`] serves hits and runs the pipeline on misses
//! - [`QueryCache::invalidate_all`] and [`QueryCache::invalidate_document`] keep
//!   the cache consistent with the paper library
//! - [`QueryCache::stats`] reports hit rate, evictions and the most reused entries
//!
//! The cache performs no I/O. All of its state sits behind one lock that is
//! never held while the pipeline runs.
//!
//! ```no_run
//! use paper_cache::{CacheConfig, QueryCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache: QueryCache = QueryCache::new(CacheConfig::from_env()?)?;
//!
//!     let stats = cache.stats().await;
//!     println!("{}", stats);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    normalize, spawn_auto_cleanup, CacheConfig, CacheConfigBuilder, CacheCounters, CacheEntry,
    CacheKey, CacheMetadata, CacheStats, CacheStore, CachedAnswer, Citation, Clock, DocumentId,
    InvalidationEvent, InvalidationReason, ManualClock, QueryCache, SourceDocuments, SystemClock,
    TopEntry,
};
pub use error::{CacheError, Result};
