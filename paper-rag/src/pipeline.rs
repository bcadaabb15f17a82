//! Collaborators the QA service is composed from

use anyhow::Result;
use async_trait::async_trait;
use paper_cache::{CachedAnswer, DocumentId};
use thiserror::Error;

use crate::models::{ChunkHit, NewPaper, PaperSummary};

/// Why a paper could not be added to the library
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("paper '{0}' already exists")]
    DuplicateFilename(String),

    #[error("paper '{0}' has no extractable text")]
    EmptyPaper(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Produces an answer from the paper library (retrieve, then generate)
#[async_trait]
pub trait AnswerPipeline: Send + Sync {
    async fn answer(
        &self,
        question: &str,
        top_k: usize,
        paper_ids: Option<&[DocumentId]>,
    ) -> Result<CachedAnswer>;
}

/// Storage and retrieval of uploaded papers
#[async_trait]
pub trait PaperLibrary: Send + Sync {
    /// Store a paper and make it searchable
    ///
    /// Filenames are unique: the check and the insert happen as one step, so
    /// of two concurrent adds with the same filename exactly one succeeds.
    async fn add(&self, paper: NewPaper) -> std::result::Result<PaperSummary, LibraryError>;

    async fn get(&self, paper_id: DocumentId) -> Result<Option<PaperSummary>>;

    /// Remove a paper; `false` when it did not exist
    async fn remove(&self, paper_id: DocumentId) -> Result<bool>;

    async fn list(&self) -> Result<Vec<PaperSummary>>;

    /// Best matching chunks, highest score first
    async fn search(
        &self,
        question: &str,
        top_k: usize,
        paper_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<ChunkHit>>;
}
