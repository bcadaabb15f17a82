//! QA service: the composition root for cache, library and answer pipeline
//!
//! Every request path goes through [`QaService`]. Queries are answered through
//! the query cache and recorded in the query log; uploads and deletes keep the
//! cache consistent once the library change has been applied.

use paper_cache::{spawn_auto_cleanup, CacheStats, DocumentId, QueryCache};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::AppConfig;
use crate::history::QueryLog;
use crate::library::InMemoryLibrary;
use crate::models::{
    NewPaper, PaperStats, PaperSummary, PopularTopics, QueryRecord, QueryRequest, QueryResponse,
};
use crate::pipeline::{AnswerPipeline, LibraryError, PaperLibrary};

/// Shortest accepted question, in characters after trimming
pub const MIN_QUESTION_CHARS: usize = 3;

/// Largest page of query history
pub const MAX_HISTORY_LIMIT: usize = 500;

/// Largest number of popular topics reported
pub const MAX_POPULAR_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Paper not found: {0}")]
    PaperNotFound(DocumentId),

    #[error(transparent)]
    Pipeline(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Research paper QA service
pub struct QaService {
    cache: Arc<QueryCache>,
    pipeline: Arc<dyn AnswerPipeline>,
    library: Arc<dyn PaperLibrary>,
    history: QueryLog,
    default_top_k: usize,
    max_top_k: usize,
}

impl QaService {
    pub fn new(
        config: &AppConfig,
        cache: Arc<QueryCache>,
        pipeline: Arc<dyn AnswerPipeline>,
        library: Arc<dyn PaperLibrary>,
    ) -> Self {
        Self {
            cache,
            pipeline,
            library,
            history: QueryLog::new(),
            default_top_k: config.default_top_k,
            max_top_k: config.max_top_k,
        }
    }

    /// Service backed by an [`InMemoryLibrary`] that also answers questions
    pub fn in_memory(config: &AppConfig) -> paper_cache::Result<Self> {
        let cache = Arc::new(QueryCache::new(config.cache.clone())?);
        let library = Arc::new(InMemoryLibrary::new());
        Ok(Self::new(config, cache, library.clone(), library))
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Start the background sweep of expired cache entries, if configured
    pub fn start_cache_cleanup(&self) -> Option<JoinHandle<()>> {
        spawn_auto_cleanup(self.cache.clone())
    }

    /// Answer a question, serving repeated questions from the cache
    ///
    /// Answered queries are logged whether or not they were cached.
    pub async fn ask(&self, request: QueryRequest) -> Result<QueryResponse> {
        let started = Instant::now();

        let question = request.question.trim();
        if question.chars().count() < MIN_QUESTION_CHARS {
            return Err(ServiceError::InvalidRequest(format!(
                "question must be at least {} characters",
                MIN_QUESTION_CHARS
            )));
        }

        let top_k = request.top_k.unwrap_or(self.default_top_k);
        if top_k == 0 || top_k > self.max_top_k {
            return Err(ServiceError::InvalidRequest(format!(
                "top_k must be between 1 and {}",
                self.max_top_k
            )));
        }

        let paper_ids = request
            .paper_ids
            .map(|mut ids| {
                ids.sort_unstable();
                ids.dedup();
                ids
            })
            .filter(|ids| !ids.is_empty());
        let filter = paper_ids.as_deref();

        let (answer, cached) = self
            .cache
            .get_or_compute(question, top_k, filter, || {
                self.pipeline.answer(question, top_k, filter)
            })
            .await?;

        let elapsed = started.elapsed().as_millis() as u64;
        info!(
            "Answered query in {}ms (cached: {}, confidence: {:.2})",
            elapsed, cached, answer.confidence
        );
        self.history
            .record(QueryRecord::new(question, top_k, filter, &answer, elapsed, cached))
            .await;

        Ok(QueryResponse::from_answer(answer, elapsed, cached))
    }

    /// Add a paper to the library, then drop every cached answer
    pub async fn upload(&self, paper: NewPaper) -> Result<PaperSummary> {
        if paper.title.trim().is_empty() || paper.filename.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "title and filename are required".to_string(),
            ));
        }
        if paper.text.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(format!(
                "paper '{}' has no text",
                paper.filename
            )));
        }

        let summary = self.library.add(paper).await.map_err(|err| match err {
            LibraryError::DuplicateFilename(_) | LibraryError::EmptyPaper(_) => {
                ServiceError::InvalidRequest(err.to_string())
            }
            LibraryError::Backend(err) => ServiceError::Pipeline(err),
        })?;
        self.cache.invalidate_all().await;

        info!("Uploaded paper {} '{}'", summary.id, summary.title);
        Ok(summary)
    }

    /// Remove a paper, then drop the cached answers that cited it
    pub async fn delete(&self, paper_id: DocumentId) -> Result<()> {
        if !self.library.remove(paper_id).await? {
            return Err(ServiceError::PaperNotFound(paper_id));
        }

        let invalidated = self.cache.invalidate_document(paper_id).await;
        info!(
            "Deleted paper {} ({} cached answers invalidated)",
            paper_id, invalidated
        );
        Ok(())
    }

    pub async fn list_papers(&self) -> Result<Vec<PaperSummary>> {
        Ok(self.library.list().await?)
    }

    pub async fn get_paper(&self, paper_id: DocumentId) -> Result<PaperSummary> {
        self.library
            .get(paper_id)
            .await?
            .ok_or(ServiceError::PaperNotFound(paper_id))
    }

    /// How often a paper was queried, and with what confidence
    pub async fn paper_stats(&self, paper_id: DocumentId) -> Result<PaperStats> {
        let paper = self.get_paper(paper_id).await?;
        Ok(self.history.paper_stats(&paper).await)
    }

    /// Logged queries, newest first
    pub async fn query_history(&self, skip: usize, limit: usize) -> Result<Vec<QueryRecord>> {
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(ServiceError::InvalidRequest(format!(
                "limit must be between 1 and {}",
                MAX_HISTORY_LIMIT
            )));
        }
        Ok(self.history.history(skip, limit).await)
    }

    /// Most frequent question words across all logged queries
    pub async fn popular_topics(&self, limit: usize) -> Result<PopularTopics> {
        if limit == 0 || limit > MAX_POPULAR_LIMIT {
            return Err(ServiceError::InvalidRequest(format!(
                "limit must be between 1 and {}",
                MAX_POPULAR_LIMIT
            )));
        }
        Ok(self.history.popular(limit).await)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Administrative flush; returns how many entries were dropped
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    /// Sweep expired entries; returns how many were dropped
    pub async fn cleanup_cache(&self) -> usize {
        self.cache.cleanup_expired().await
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }
}
