//! Cached answer payload
//!
//! The store treats values as opaque. The only field the cache ever reads is
//! `source_document_ids`, through [`SourceDocuments`], when a paper is removed.

use crate::cache::invalidation::SourceDocuments;
use crate::cache::types::DocumentId;
use serde::{Deserialize, Serialize};

/// Where a piece of an answer came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub paper_id: DocumentId,
    pub paper_title: String,
    /// PDF filename, for unambiguous source identification
    pub filename: String,
    pub section: Option<String>,
    pub page: u32,
    /// Retrieval score in `[0, 1]`
    pub relevance_score: f64,
    pub chunk_text: Option<String>,
}

/// A generated answer with its citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    /// Titles of the papers the answer drew on
    pub sources_used: Vec<String>,
    /// Ids of the papers the answer drew on
    pub source_document_ids: Vec<DocumentId>,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Time the pipeline spent producing the answer
    pub response_time_ms: u64,
}

impl CachedAnswer {
    /// An answer with no citations yet
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            citations: Vec::new(),
            sources_used: Vec::new(),
            source_document_ids: Vec::new(),
            confidence: 0.0,
            response_time_ms: 0,
        }
    }

    /// Attach a citation, recording its paper as a source
    pub fn with_citation(mut self, citation: Citation) -> Self {
        if !self.source_document_ids.contains(&citation.paper_id) {
            self.source_document_ids.push(citation.paper_id);
        }
        if !self.sources_used.contains(&citation.paper_title) {
            self.sources_used.push(citation.paper_title.clone());
        }
        self.citations.push(citation);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_response_time_ms(mut self, millis: u64) -> Self {
        self.response_time_ms = millis;
        self
    }

    /// Mark papers as sources without a specific citation
    pub fn with_sources(mut self, ids: &[DocumentId]) -> Self {
        for id in ids {
            if !self.source_document_ids.contains(id) {
                self.source_document_ids.push(*id);
            }
        }
        self
    }
}

impl SourceDocuments for CachedAnswer {
    fn source_documents(&self) -> &[DocumentId] {
        &self.source_document_ids
    }
}
