//! Cache invalidation on library changes
//!
//! Two hooks keep cached answers consistent with the paper library:
//! - adding a paper clears everything, since a new paper can change the
//!   relevant-chunk set for any question asked so far
//! - removing a paper drops every answer that drew on it
//!
//! The plain hooks are fire-and-forget: a failure is logged and swallowed so it
//! can never fail the upload or delete that triggered it. A failed invalidation
//! leaves entries that still expire by TTL. The `try_` variants surface the
//! error for callers that want it.

use crate::cache::orchestrator::QueryCache;
use crate::cache::types::DocumentId;
use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Exposes which library documents a cached value was built from
pub trait SourceDocuments {
    fn source_documents(&self) -> &[DocumentId];

    fn references_document(&self, document_id: DocumentId) -> bool {
        self.source_documents().contains(&document_id)
    }
}

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// A paper was added to the library
    DocumentAdded,

    /// A paper was removed from the library
    DocumentRemoved { document_id: DocumentId },

    /// Administrative flush
    Manual,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::DocumentAdded => write!(f, "document added"),
            InvalidationReason::DocumentRemoved { document_id } => {
                write!(f, "document removed: {}", document_id)
            }
            InvalidationReason::Manual => write!(f, "manual invalidation"),
        }
    }
}

/// Record of a completed invalidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// When the invalidation occurred
    pub timestamp: DateTime<Utc>,

    /// Number of entries removed
    pub removed: usize,
}

impl InvalidationEvent {
    pub fn new(reason: InvalidationReason, removed: usize) -> Self {
        Self {
            reason,
            timestamp: Utc::now(),
            removed,
        }
    }
}

impl<V: Clone + Send + Sync> QueryCache<V> {
    /// Clear the whole cache after a paper was added
    pub async fn try_invalidate_all(&self) -> Result<InvalidationEvent> {
        let removed = self.bounded("invalidate_all", self.clear()).await?;
        info!("Invalidated {} cached answers: document added", removed);
        Ok(InvalidationEvent::new(InvalidationReason::DocumentAdded, removed))
    }

    /// Fire-and-forget form of [`try_invalidate_all`](Self::try_invalidate_all)
    pub async fn invalidate_all(&self) {
        if let Err(e) = self.try_invalidate_all().await {
            warn!("Cache invalidation after document upload failed: {}", e);
        }
    }

    /// Run an invalidation step with the configured time bound
    async fn bounded<T, F>(&self, context: &str, op: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let limit: Duration = self.config().invalidation_timeout;
        tokio::time::timeout(limit, op)
            .await
            .map_err(|_| CacheError::InvalidationTimeout {
                timeout_ms: limit.as_millis() as u64,
                context: context.to_string(),
            })
    }
}

impl<V: Clone + Send + Sync + SourceDocuments> QueryCache<V> {
    /// Drop every cached answer that drew on a removed paper
    pub async fn try_invalidate_document(
        &self,
        document_id: DocumentId,
    ) -> Result<InvalidationEvent> {
        let removed = match self.store() {
            Some(store) => {
                self.bounded(
                    "invalidate_document",
                    store.remove_matching(|value| value.references_document(document_id)),
                )
                .await?
            }
            None => 0,
        };

        info!(
            "Invalidated {} cached answers: document {} removed",
            removed, document_id
        );
        Ok(InvalidationEvent::new(
            InvalidationReason::DocumentRemoved { document_id },
            removed,
        ))
    }

    /// Fire-and-forget form of [`try_invalidate_document`](Self::try_invalidate_document)
    ///
    /// Returns how many entries were removed, zero when the hook failed.
    pub async fn invalidate_document(&self, document_id: DocumentId) -> usize {
        match self.try_invalidate_document(document_id).await {
            Ok(event) => event.removed,
            Err(e) => {
                warn!(
                    "Cache invalidation after deleting document {} failed: {}",
                    document_id, e
                );
                0
            }
        }
    }
}
